//! Gateways: typed clients for the services the movie service depends on.
//!
//! Each call re-resolves the target through the [`AddressSelector`], so a
//! dependency that moves or scales is picked up on the next request. The
//! HTTP gateways wrap every call in a deadline; dropping the returned
//! future abandons the in-flight request.
//!
//! [`AddressSelector`]: cinegrid_discovery::AddressSelector

mod metadata;
mod rating;

use async_trait::async_trait;
use cinegrid_core::{ApiResponse, Metadata, Rating};
use cinegrid_discovery::transport::{RawResponse, TransportError};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{MovieError, MovieResult};

pub use metadata::HttpMetadataGateway;
pub use rating::HttpRatingGateway;

/// Fetches movie metadata from the metadata service.
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    async fn get(&self, id: &str) -> MovieResult<Metadata>;
}

/// Reads and writes ratings on the rating service.
#[async_trait]
pub trait RatingGateway: Send + Sync {
    /// Mean of all ratings for the record.
    async fn get_aggregated_rating(&self, record_id: &str, record_type: &str) -> MovieResult<f64>;

    async fn put_rating(
        &self,
        record_id: &str,
        record_type: &str,
        rating: &Rating,
    ) -> MovieResult<()>;
}

// ── Response handling ──────────────────────────────────────────────

/// Map a transport failure onto the movie error kinds.
pub(crate) fn transport_error(service: &str, err: TransportError) -> MovieError {
    match err {
        TransportError::InvalidRequest(msg) => MovieError::InvalidInput(msg),
        other => MovieError::UpstreamUnavailable(format!("{service}: {other}")),
    }
}

/// Interpret a remote response carrying an `ApiResponse<T>` envelope.
///
/// 404 becomes `NotFound`, any other non-2xx becomes `UpstreamError`, and a
/// 2xx body that does not decode or carries no data becomes `Decode`.
pub(crate) fn decode_response<T: DeserializeOwned>(
    service: &str,
    what: &str,
    resp: RawResponse,
) -> MovieResult<T> {
    if resp.status == StatusCode::NOT_FOUND {
        return Err(MovieError::NotFound(what.to_string()));
    }
    if !resp.status.is_success() {
        return Err(MovieError::UpstreamError {
            service: service.to_string(),
            status: resp.status.as_u16(),
            message: error_message(&resp),
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_slice(&resp.body).map_err(|e| MovieError::Decode {
            service: service.to_string(),
            message: e.to_string(),
        })?;
    envelope.data.ok_or_else(|| MovieError::Decode {
        service: service.to_string(),
        message: envelope
            .error
            .unwrap_or_else(|| "response carried no data".to_string()),
    })
}

/// The remote error text: the envelope's `error` if present, else the raw body.
fn error_message(resp: &RawResponse) -> String {
    serde_json::from_slice::<ApiResponse<serde_json::Value>>(&resp.body)
        .ok()
        .and_then(|envelope| envelope.error)
        .unwrap_or_else(|| String::from_utf8_lossy(&resp.body).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn raw(status: StatusCode, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn success_envelope_yields_data() {
        let resp = raw(StatusCode::OK, r#"{"success":true,"data":3.5}"#);
        let v: f64 = decode_response("rating", "m1", resp).unwrap();
        assert_eq!(v, 3.5);
    }

    #[test]
    fn not_found_status_is_not_found() {
        let resp = raw(StatusCode::NOT_FOUND, r#"{"success":false,"error":"nope"}"#);
        let err = decode_response::<f64>("rating", "m1", resp).unwrap_err();
        assert!(matches!(err, MovieError::NotFound(what) if what == "m1"));
    }

    #[test]
    fn server_error_carries_status_and_message() {
        let resp = raw(StatusCode::INTERNAL_SERVER_ERROR, r#"{"success":false,"error":"boom"}"#);
        let err = decode_response::<f64>("rating", "m1", resp).unwrap_err();
        match err {
            MovieError::UpstreamError { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let resp = raw(StatusCode::OK, "not json");
        let err = decode_response::<Metadata>("metadata", "m1", resp).unwrap_err();
        assert!(matches!(err, MovieError::Decode { .. }));
    }

    #[test]
    fn envelope_without_data_is_decode_error() {
        let resp = raw(StatusCode::OK, r#"{"success":true}"#);
        let err = decode_response::<f64>("rating", "m1", resp).unwrap_err();
        assert!(matches!(err, MovieError::Decode { .. }));
    }

    #[test]
    fn connect_failures_are_upstream_unavailable() {
        let err = transport_error(
            "metadata",
            TransportError::Connect {
                address: "127.0.0.1:1".into(),
                reason: "refused".into(),
            },
        );
        assert!(matches!(err, MovieError::UpstreamUnavailable(_)));
    }
}
