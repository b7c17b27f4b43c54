pub mod core;
pub mod pipeline;
pub mod scraping;

// --- Primary core exports ---
pub use core::types;
pub use core::types::*;
pub use core::{ScoutConfig, ScoutError};

pub use pipeline::{Pipeline, PipelineOutcome};
pub use scraping::{BrowserSession, ChromeSession};
