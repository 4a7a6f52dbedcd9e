//! cinegrid-rating: rating storage and aggregation.
//!
//! ```text
//! HTTP (axum)
//!   ├── GET /rating?id=&type=                → aggregate (mean) rating
//!   └── PUT /rating?id=&type=&userId=&value= → append a rating
//! RatingController
//!   ├── RatingRepository (trait) ← MemoryRatingRepository
//!   └── RateIngester (trait)     ← JsonLinesIngester
//! ```
//!
//! Ratings are append-only: a second rating from the same user is stored
//! alongside the first and both count toward the mean.

pub mod controller;
pub mod error;
pub mod handler;
pub mod ingester;
pub mod repository;

pub use controller::RatingController;
pub use error::{RatingError, RatingResult};
pub use handler::build_router;
pub use ingester::{JsonLinesIngester, RateIngester};
pub use repository::{MemoryRatingRepository, RatingRepository};
