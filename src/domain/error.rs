//! Domain error types.
//!
//! Only fatal conditions live here. Advisory outcomes (too few candidates,
//! missing returns) are reported through the allocator's action log and the
//! simulator's step outcome instead.

/// Top-level error type for portsim.
#[derive(Debug, thiserror::Error)]
pub enum PortsimError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortsimError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        PortsimError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        PortsimError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&PortsimError> for std::process::ExitCode {
    fn from(err: &PortsimError) -> Self {
        let code: u8 = match err {
            PortsimError::Io(_) => 1,
            PortsimError::Configuration { .. }
            | PortsimError::ConfigParse { .. }
            | PortsimError::ConfigMissing { .. }
            | PortsimError::ConfigInvalid { .. } => 2,
            PortsimError::Data { .. } => 3,
            PortsimError::Json(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
