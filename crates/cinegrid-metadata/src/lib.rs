//! cinegrid-metadata: the movie metadata store.
//!
//! ```text
//! HTTP (axum)
//!   ├── GET /metadata?id=   → MetadataController::get
//!   └── PUT /metadata       → MetadataController::put
//! MetadataController
//!   └── MetadataRepository (trait) ← MemoryMetadataRepository
//! ```

pub mod controller;
pub mod error;
pub mod handler;
pub mod repository;

pub use controller::MetadataController;
pub use error::{MetadataError, MetadataResult};
pub use handler::build_router;
pub use repository::{MemoryMetadataRepository, MetadataRepository};
