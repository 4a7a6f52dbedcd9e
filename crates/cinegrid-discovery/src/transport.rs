//! Minimal HTTP/1.1 client used for remote calls between Cinegrid services
//! and for talking to the Consul agent.
//!
//! Each call opens one connection, sends one request, and reads the whole
//! body, all under a single deadline.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use thiserror::Error;
use tracing::debug;

/// Transport-level failures, before any domain interpretation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("request to {address} failed: {reason}")]
    Request { address: String, reason: String },

    #[error("request to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Status and fully-read body of a response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Send one request to `address` (`host:port`) and collect the response.
///
/// `path_and_query` is sent in origin form, e.g. `/rating?id=m1&type=movie`.
/// A JSON body sets `content-type: application/json`.
pub async fn send(
    address: &str,
    method: Method,
    path_and_query: &str,
    json_body: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<RawResponse, TransportError> {
    let result = tokio::time::timeout(
        timeout,
        send_inner(address, method, path_and_query, json_body),
    )
    .await;

    match result {
        Ok(response) => response,
        Err(_) => {
            debug!(%address, path = %path_and_query, "remote call timed out");
            Err(TransportError::Timeout {
                address: address.to_string(),
                timeout,
            })
        }
    }
}

async fn send_inner(
    address: &str,
    method: Method,
    path_and_query: &str,
    json_body: Option<Vec<u8>>,
) -> Result<RawResponse, TransportError> {
    let stream = tokio::net::TcpStream::connect(address)
        .await
        .map_err(|e| TransportError::Connect {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| TransportError::Connect {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut builder = http::Request::builder()
        .method(method)
        .uri(path_and_query)
        .header("host", address)
        .header("user-agent", "cinegrid/0.1");
    if json_body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let req = builder
        .body(Full::new(Bytes::from(json_body.unwrap_or_default())))
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    let request_err = |e: hyper::Error| TransportError::Request {
        address: address.to_string(),
        reason: e.to_string(),
    };

    let resp = sender.send_request(req).await.map_err(request_err)?;
    let status = resp.status();
    let body = resp.into_body().collect().await.map_err(request_err)?.to_bytes();

    debug!(%address, path = %path_and_query, %status, "remote call completed");
    Ok(RawResponse { status, body })
}
