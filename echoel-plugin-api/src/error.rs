//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A device or resource the plugin needs is not present
    #[error("Resource unavailable: {0}")]
    Unavailable(String),

    /// Unknown capability name
    #[error("Invalid capability: {0}")]
    InvalidCapability(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an unavailable-resource error
    pub fn unavailable(resource: impl Into<String>) -> Self {
        Self::Unavailable(resource.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = PluginError::Config("missing key".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: missing key");

        let unavailable = PluginError::Unavailable("gpu".to_string());
        assert_eq!(unavailable.to_string(), "Resource unavailable: gpu");

        let custom_err = PluginError::Custom("something happened".to_string());
        assert_eq!(custom_err.to_string(), "something happened");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let plugin_err: PluginError = io_err.into();

        assert!(matches!(plugin_err, PluginError::Io(_)));
        assert!(plugin_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(PluginError::custom("test"), PluginError::Custom(_)));
        assert!(matches!(PluginError::config("bad"), PluginError::Config(_)));
        assert!(matches!(
            PluginError::unavailable("haptics"),
            PluginError::Unavailable(_)
        ));
    }

    #[test]
    fn test_invalid_capability_error() {
        let err = PluginError::InvalidCapability("telepathy".into());
        assert!(err.to_string().contains("telepathy"));
    }
}
