use thiserror::Error;

/// Recoverable failures of the harvesting core.
///
/// Structural variants (`MissingHeading`, `MissingLabel`) are expected on a
/// live site and are handled at the item boundary; they never abort a page.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("listing card has no title heading")]
    MissingHeading,

    #[error("label not found: {0}")]
    MissingLabel(&'static str),

    #[error("invalid selector `{selector}`: {msg}")]
    InvalidSelector { selector: String, msg: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("navigation to {url} failed: {msg}")]
    Navigation { url: String, msg: String },

    #[error("location service error: {0}")]
    LocationService(String),

    #[error("listing `{0}` reached normalization without an identifier")]
    MissingIdentifier(String),

    #[error("{0} listings exceed the identifier range")]
    IdentifierOverflow(usize),
}

impl ScoutError {
    /// True for failures caused by page shape rather than by the session.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ScoutError::MissingHeading | ScoutError::MissingLabel(_)
        )
    }
}
