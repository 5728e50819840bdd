//! Error type shared by every bucketd operation.
//!
//! # Design
//! A single `BucketClientError` carries the request context (operation name,
//! method, endpoint, resource) so the rendered message can be correlated with
//! bucketd logs. What went wrong lives in `ErrorKind`, which callers match on
//! directly. Only `ErrorKind::Status` means bucketd actually answered;
//! everything else reports status code 0.

use std::error::Error as StdError;

use crate::http::{HttpMethod, TransportError};

#[derive(Debug, thiserror::Error)]
#[error("error in {operation} [{method} {endpoint}{resource}]: {kind}")]
pub struct BucketClientError {
    pub operation: &'static str,
    pub method: HttpMethod,
    pub endpoint: String,
    pub resource: String,
    #[source]
    pub kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// bucketd answered with a non-2xx status. The response body is dropped.
    /// `detail` is set when the client itself synthesized the status.
    #[error("bucketd returned HTTP status {status} {error_type}{}", detail_suffix(.detail))]
    Status {
        status: u16,
        error_type: String,
        detail: Option<String>,
    },

    /// No response was obtained: connection failure, cancellation, timeout.
    #[error("HTTP request to bucketd failed: {0}")]
    Transport(#[source] TransportError),

    #[error("HTTP request to bucketd failed: error reading response body: {0}")]
    BodyRead(#[source] std::io::Error),

    #[error("HTTP request to bucketd failed: bucketd returned a malformed response body: {0}")]
    MalformedResponse(#[source] Box<dyn StdError + Send + Sync>),

    /// A 2xx body that parsed but did not hold what the operation expects.
    #[error("HTTP request to bucketd failed: {0}")]
    InvalidResponse(String),

    /// Rejected locally, nothing was sent.
    #[error("HTTP request to bucketd failed: {0}")]
    InvalidArgument(String),

    #[error("HTTP request to bucketd failed: error marshaling request body: {0}")]
    Serialization(#[source] serde_json::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl BucketClientError {
    pub(crate) fn new(
        operation: &'static str,
        method: HttpMethod,
        endpoint: &str,
        resource: &str,
        kind: ErrorKind,
    ) -> Self {
        Self {
            operation,
            method,
            endpoint: endpoint.to_string(),
            resource: resource.to_string(),
            kind,
        }
    }

    /// HTTP status returned by bucketd, or 0 when no response was obtained.
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            ErrorKind::Status { status, .. } => *status,
            _ => 0,
        }
    }

    /// Error token from the response status line, often empty.
    pub fn error_type(&self) -> &str {
        match &self.kind {
            ErrorKind::Status { error_type, .. } => error_type,
            _ => "",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == 409
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport(_))
    }

    pub fn is_malformed_response(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, BucketClientError>;
