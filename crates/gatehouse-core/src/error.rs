//! Error types for the Gatehouse core.

/// Core error type for Gatehouse infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for Gatehouse operations.
pub type GatehouseResult<T> = Result<T, GatehouseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_prefix_configuration_errors() {
        let error = GatehouseError::Config("invalid listen address".to_owned());
        assert_eq!(error.to_string(), "configuration error: invalid listen address");
    }
}
