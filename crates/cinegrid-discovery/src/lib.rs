//! cinegrid-discovery: runtime service discovery for Cinegrid.
//!
//! Services locate each other through a [`Registry`] instead of static
//! addresses. Two interchangeable backends implement the same capability:
//!
//! ```text
//! Registry (trait)
//!   ├── MemoryRegistry : process-local table, heartbeat freshness window
//!   └── ConsulRegistry : Consul agent HTTP API, TTL health checks
//!
//! AddressSelector
//!   └── service_addresses() → uniform random pick per call
//!
//! HeartbeatReporter
//!   └── Per-instance background task calling report_health_state()
//! ```
//!
//! # Liveness
//!
//! The memory registry lists an instance only while its last heartbeat is
//! within the freshness window (15 minutes by default). Stale entries are
//! skipped on lookup, not deleted, so a crashed process drops out of
//! listings without ever deregistering. The Consul backend defers to
//! Consul's own passing checks.

pub mod consul;
pub mod error;
pub mod heartbeat;
pub mod instance;
pub mod memory;
pub mod registry;
pub mod selector;
pub mod transport;

pub use consul::ConsulRegistry;
pub use error::{DiscoveryError, DiscoveryResult};
pub use heartbeat::HeartbeatReporter;
pub use instance::generate_instance_id;
pub use memory::MemoryRegistry;
pub use registry::{Registry, split_host_port};
pub use selector::AddressSelector;
