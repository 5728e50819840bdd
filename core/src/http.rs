//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are described as plain data. `BucketClient` builds
//! an `HttpRequest`, hands it to whatever `Transport` it owns, and interprets
//! the `HttpResponse` that comes back. The default transport lives in
//! `crate::transport`; tests plug in scripted ones.
//!
//! The response body is a lazy reader rather than a buffer: bucketd error
//! responses are classified from the status line alone, so their bodies are
//! never read.

use std::fmt;
use std::io::Read;

use crate::context::CallContext;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is the endpoint concatenated with the resource path, already
/// percent-encoded by the operation that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response as handed back by a `Transport`.
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase of the status line, e.g. `NoSuchBucket` or `Not Found`.
    pub status_text: String,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: Box::new(std::io::Cursor::new(body.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Full status line as `"{status} {reason}"`.
    pub fn status_line(&self) -> String {
        if self.status_text.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.status_text)
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// Failure to obtain a response at all.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Connection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Executes one HTTP exchange.
///
/// Implementations must return non-2xx responses as `Ok`: status
/// interpretation belongs to the client, not the transport.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest, ctx: &CallContext) -> Result<HttpResponse, TransportError>;
}

/// Any matching closure is a transport, handy for tests and for wrapping an
/// existing connection.
impl<F> Transport for F
where
    F: Fn(&HttpRequest, &CallContext) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn execute(&self, request: &HttpRequest, ctx: &CallContext) -> Result<HttpResponse, TransportError> {
        self(request, ctx)
    }
}
