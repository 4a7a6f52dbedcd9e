//! Domain types exchanged between Cinegrid services.

use serde::{Deserialize, Serialize};

/// Identifier of a rated record (a movie id for movie records).
pub type RecordId = String;

/// Kind of record a rating applies to.
pub type RecordType = String;

/// Identifier of the user who submitted a rating.
pub type UserId = String;

/// A single rating score.
pub type RatingValue = i32;

/// Record type used for movie ratings.
pub const RECORD_TYPE_MOVIE: &str = "movie";

/// Registry names of the three services.
pub const METADATA_SERVICE: &str = "metadata";
pub const RATING_SERVICE: &str = "rating";
pub const MOVIE_SERVICE: &str = "movie";

// ── Metadata ───────────────────────────────────────────────────────

/// Descriptive information about a movie, owned by the metadata service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub director: String,
}

// ── Ratings ────────────────────────────────────────────────────────

/// One user's score for a record. Stored ratings are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub record_id: RecordId,
    pub user_id: UserId,
    pub value: RatingValue,
}

impl Rating {
    pub fn new(
        record_id: impl Into<RecordId>,
        user_id: impl Into<UserId>,
        value: RatingValue,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            user_id: user_id.into(),
            value,
        }
    }
}

/// A rating submitted through an ingestion stream rather than the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RatingEvent {
    pub user_id: UserId,
    pub record_id: RecordId,
    pub record_type: RecordType,
    pub value: RatingValue,
}

impl RatingEvent {
    /// The rating this event carries.
    pub fn to_rating(&self) -> Rating {
        Rating::new(self.record_id.clone(), self.user_id.clone(), self.value)
    }
}

// ── Composition ────────────────────────────────────────────────────

/// Movie metadata merged with its aggregated rating.
///
/// Built per request by the movie service; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}
