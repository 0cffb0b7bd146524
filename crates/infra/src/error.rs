use thiserror::Error;

use wms_core::DomainError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to read settings: {0}")]
    Settings(#[source] config::ConfigError),

    #[error("failed to load {what} from {source_name}: {error}")]
    File {
        what: &'static str,
        source_name: String,
        #[source]
        error: config::ConfigError,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
