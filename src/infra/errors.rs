// src/infra/errors.rs — Infrastructure error types for Velle

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VelleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Audit sink '{sink}' unavailable: {message}")]
    AuditSink { sink: String, message: String },

    #[error("Terminal injector unavailable: {0}")]
    Injector(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VelleError {
    /// Startup errors that an operator fixes by editing `velle.toml`.
    pub fn is_config_error(&self) -> bool {
        matches!(self, VelleError::Config(_) | VelleError::ConfigParse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_classified() {
        assert!(VelleError::Config("missing remote_url".into()).is_config_error());
        let io = VelleError::Io(std::io::Error::other("disk full"));
        assert!(!io.is_config_error());
    }

    #[test]
    fn test_audit_sink_message() {
        let e = VelleError::AuditSink {
            sink: "remote".into(),
            message: "connection refused".into(),
        };
        assert_eq!(
            e.to_string(),
            "Audit sink 'remote' unavailable: connection refused"
        );
    }
}
