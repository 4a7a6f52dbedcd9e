//! cinegrid-movie: the movie composition service.
//!
//! # Architecture
//!
//! ```text
//! GET /movie?id=
//!   └── MovieController::get
//!       ├── MetadataGateway::get                  (short-circuits on NotFound)
//!       └── RatingGateway::get_aggregated_rating
//!           └── AddressSelector → Registry → one HTTP call
//! ```
//!
//! # Failure policy
//!
//! Gateways translate transport outcomes into [`MovieError`] kinds. A missing
//! metadata record or a record with no ratings both fail the whole
//! composition with `NotFound`; there is no partial result. The two calls
//! run sequentially, so latency is the sum of both dependencies.

pub mod controller;
pub mod error;
pub mod gateway;
pub mod handler;

pub use controller::MovieController;
pub use error::{MovieError, MovieResult};
pub use gateway::{HttpMetadataGateway, HttpRatingGateway, MetadataGateway, RatingGateway};
pub use handler::build_router;
