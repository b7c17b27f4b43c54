pub mod browser;
pub mod browser_manager;
pub mod site;

pub use browser::{wait_for_change, wait_for_selector, BrowserSession, WaitPolicy};
pub use browser_manager::ChromeSession;
