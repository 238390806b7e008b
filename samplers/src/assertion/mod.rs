//! Built-in assertions

mod duration;
mod response;

pub use duration::DurationAssertion;
pub use response::{MatchRule, ResponseAssertion, ResponseField};

/// Invalid assertion configuration
#[derive(Debug, thiserror::Error)]
pub enum AssertionConfigError {
    /// No pattern to test against
    #[error("assertion has no patterns")]
    NoPatterns,

    /// A pattern is not a valid regular expression
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },
}
