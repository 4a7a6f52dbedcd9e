//! Movie service error types.
//!
//! Gateways translate transport and registry failures into these kinds
//! before returning to the controller.

use cinegrid_discovery::DiscoveryError;
use thiserror::Error;

pub type MovieResult<T> = Result<T, MovieError>;

#[derive(Debug, Error)]
pub enum MovieError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("{service} responded with status {status}: {message}")]
    UpstreamError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("failed to decode {service} response: {message}")]
    Decode { service: String, message: String },

    #[error("registry backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<DiscoveryError> for MovieError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::NotFound(service) => {
                MovieError::NotFound(format!("no live instances of {service}"))
            }
            DiscoveryError::InvalidAddress(addr) => {
                MovieError::InvalidInput(format!("invalid address {addr}"))
            }
            DiscoveryError::InvalidName(name) => {
                MovieError::InvalidInput(format!("invalid name {name:?}"))
            }
            DiscoveryError::NotRegistered(service) => {
                MovieError::NotFound(format!("{service} is not registered"))
            }
            e @ (DiscoveryError::BackendUnavailable(_) | DiscoveryError::Backend(_)) => {
                MovieError::BackendUnavailable(e.to_string())
            }
        }
    }
}
