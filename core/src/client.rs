//! `BucketClient` and the request executor shared by every operation.
//!
//! # Design
//! `BucketClient` holds the bucketd endpoint and the transport it owns; it
//! carries no other state between calls. Each typed operation (see the
//! `bucket`, `listing`, `batch`, `metastore` and `admin` modules) builds a
//! resource path, runs exactly one exchange through [`BucketClient::request`],
//! and decodes the bytes it gets back. Nothing is retried or cached here.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::{BucketClientError, ErrorKind, Result};
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::transport::UreqTransport;

/// Header flagging a request as safe to replay. Only its presence matters.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";

/// Per-request knobs for [`BucketClient::request`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub idempotent: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub(crate) fn json(self, body: impl Into<Vec<u8>>) -> Self {
        self.body(body).content_type(CONTENT_TYPE_JSON)
    }

    /// Attach an empty `Idempotency-Key` header.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }
}

/// Client for one bucketd endpoint.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct BucketClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for BucketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl BucketClient {
    /// Client talking to `endpoint` through a fresh [`UreqTransport`].
    pub fn new(endpoint: &str) -> Self {
        Self::with_transport(endpoint, UreqTransport::new())
    }

    pub fn with_transport(endpoint: &str, transport: impl Transport + 'static) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport: Arc::new(transport),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut transport = UreqTransport::with_user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout() {
            transport = transport.default_timeout(timeout);
        }
        Self::with_transport(&config.endpoint, transport)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request to `{endpoint}{resource}` and return the response body.
    ///
    /// `resource` is used verbatim: any path segment that may hold reserved
    /// characters must already be percent-encoded. Non-2xx responses become
    /// `ErrorKind::Status` without their body being read.
    pub fn request(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        method: HttpMethod,
        resource: &str,
        options: RequestOptions,
    ) -> Result<Vec<u8>> {
        let fail = |kind| self.error(operation, method, resource, kind);

        let mut headers = Vec::new();
        if let Some(content_type) = options.content_type {
            headers.push(("Content-Type".to_string(), content_type));
        }
        if options.idempotent {
            headers.push((IDEMPOTENCY_HEADER.to_string(), String::new()));
        }
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.endpoint, resource),
            headers,
            body: options.body,
        };

        ctx.check().map_err(|e| fail(ErrorKind::Transport(e)))?;
        debug!(operation, %method, url = %request.url, "sending bucketd request");

        let response = self
            .transport
            .execute(&request, ctx)
            .map_err(|e| fail(ErrorKind::Transport(e)))?;
        // the token may have fired while the exchange was in flight
        ctx.check().map_err(|e| fail(ErrorKind::Transport(e)))?;

        if !response.is_success() {
            let error_type = error_type_from_status_line(&response.status_line());
            debug!(operation, %method, url = %request.url, status = response.status, %error_type,
                "bucketd returned an error status");
            return Err(fail(ErrorKind::Status {
                status: response.status,
                error_type,
                detail: None,
            }));
        }

        let status = response.status;
        let mut body = Vec::new();
        if let Err(read_err) = ctx.guard_reader(response.body).read_to_end(&mut body) {
            return Err(match ctx.check() {
                Err(canceled) => fail(ErrorKind::Transport(canceled)),
                Ok(()) => fail(ErrorKind::BodyRead(read_err)),
            });
        }
        debug!(operation, %method, url = %request.url, status, bytes = body.len(),
            "bucketd request completed");
        Ok(body)
    }

    pub(crate) fn error(
        &self,
        operation: &'static str,
        method: HttpMethod,
        resource: &str,
        kind: ErrorKind,
    ) -> BucketClientError {
        BucketClientError::new(operation, method, &self.endpoint, resource, kind)
    }

    pub(crate) fn decode<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: HttpMethod,
        resource: &str,
        body: &[u8],
    ) -> Result<T> {
        serde_json::from_slice(body)
            .map_err(|e| self.error(operation, method, resource, ErrorKind::MalformedResponse(Box::new(e))))
    }

    pub(crate) fn encode<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: HttpMethod,
        resource: &str,
        value: &T,
    ) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| self.error(operation, method, resource, ErrorKind::Serialization(e)))
    }
}

/// Error token of a `"{status} {token}"` status line.
///
/// bucketd puts a single-word error name in the reason phrase; any other
/// shape (no reason, or a multi-word phrase such as `Not Found`) has none.
pub(crate) fn error_type_from_status_line(status_line: &str) -> String {
    match status_line.split(' ').collect::<Vec<_>>()[..] {
        [_, token] => token.to_string(),
        _ => String::new(),
    }
}

/// Percent-encode one path segment so that `/` and friends stay inside it.
pub(crate) fn escape_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Append `query` to `resource`, form-encoded, omitting `?` when empty.
pub(crate) fn with_query<Q: Serialize>(resource: String, query: &Q) -> std::result::Result<String, String> {
    let encoded = serde_urlencoded::to_string(query).map_err(|e| e.to_string())?;
    if encoded.is_empty() {
        Ok(resource)
    } else {
        Ok(format!("{resource}?{encoded}"))
    }
}
