use thiserror::Error;

use crate::config::LoadError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http client error: {message}")]
    HttpClient { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn http_client(message: impl Into<String>) -> Self {
        Self::HttpClient {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<LoadError> for InfraError {
    fn from(error: LoadError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_become_configuration_errors() {
        let error = InfraError::from(LoadError::Invalid {
            key: "server.addr",
            reason: "missing port".into(),
        });
        assert!(matches!(error, InfraError::Configuration { .. }));
        assert_eq!(
            error.to_string(),
            "configuration error: invalid configuration for `server.addr`: missing port"
        );
    }
}
