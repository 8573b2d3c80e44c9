//! Errors raised while reading configuration and parsing domain values

use thiserror::Error;

/// Failures raised by `common` itself. Storage, GitHub and HTTP errors live
/// in their own crates (`sqlx::Error`, `github::ClientError`, `api::ApiError`).
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// Environment settings that cannot work together
    #[error("Configuration error: {0}")]
    Config(String),

    /// A period, size category or similar value that failed to parse
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SizeCategory;
    use crate::rollups::AggregationPeriod;

    #[test]
    fn test_parse_failures_are_invalid_input() {
        let period = "yearly".parse::<AggregationPeriod>();
        assert!(matches!(period, Err(Error::InvalidInput(_))));

        let size = "XXL".parse::<SizeCategory>();
        assert!(matches!(size, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::Config("PORT must be set".to_string()).to_string(),
            "Configuration error: PORT must be set"
        );
    }
}
