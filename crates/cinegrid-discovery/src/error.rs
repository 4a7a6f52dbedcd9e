//! Discovery error types.

use thiserror::Error;

/// Result type alias for registry operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors that can occur while registering or resolving service instances.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no live instances for service: {0}")]
    NotFound(String),

    #[error("service not registered yet: {0}")]
    NotRegistered(String),

    #[error("invalid host:port address: {0}")]
    InvalidAddress(String),

    #[error("invalid service or instance name: {0:?}")]
    InvalidName(String),

    #[error("registry backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("registry backend error: {0}")]
    Backend(String),
}
