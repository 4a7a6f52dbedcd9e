//! cinegrid-core: types shared by the Cinegrid services.
//!
//! Holds the values exchanged between the metadata store, the rating
//! aggregator and the movie composition service, plus the `cinegrid.toml`
//! configuration model used by the daemon.

pub mod api;
pub mod config;
pub mod types;

pub use api::ApiResponse;
pub use config::{
    CinegridConfig, GatewayConfig, IngestConfig, RegistryBackend, RegistryConfig, ServerConfig,
    parse_duration,
};
pub use types::*;
