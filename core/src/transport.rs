//! Default blocking transport built on `ureq`.
//!
//! # Design
//! A `UreqTransport` owns its agent; there is no process-wide client. The
//! remaining deadline of the call becomes ureq's per-request timeout. When
//! the context also carries a cancellation token, the exchange runs on a
//! worker thread and the caller waits for it in short slices, checking the
//! token between them: a fired token returns `Canceled` right away and the
//! worker is left to finish (or time out) on its own.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use tracing::trace;

use crate::context::CallContext;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

/// How often a cancelable exchange looks at its token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// `Transport` backed by a `ureq::Agent` owned by this value.
///
/// Clones share the agent's connection pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    default_timeout: Option<Duration>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_agent(ureq::AgentBuilder::new().build())
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            default_timeout: None,
        }
    }

    /// Upper bound applied to calls whose context carries no deadline.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub(crate) fn with_user_agent(user_agent: &str) -> Self {
        Self::with_agent(ureq::AgentBuilder::new().user_agent(user_agent).build())
    }

    /// Run `request` on a worker thread, giving up as soon as `ctx` fires.
    fn exchange_cancelable(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
        ctx: &CallContext,
    ) -> Result<HttpResponse, TransportError> {
        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let owned = request.clone();
        std::thread::spawn(move || {
            // the receiver is gone once the call was canceled
            let _ = tx.send(exchange(&agent, &owned, timeout));
        });
        loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(err) = ctx.check() {
                        trace!(url = %request.url, error = %err, "abandoning in-flight exchange");
                        return Err(err);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::Connection("transport worker exited".to_string()))
                }
            }
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// One blocking exchange. Non-2xx statuses are data for the caller to
/// classify; only failures to get a response at all are `Err`.
fn exchange(
    agent: &ureq::Agent,
    request: &HttpRequest,
    timeout: Option<Duration>,
) -> Result<HttpResponse, TransportError> {
    let mut req = agent.request(request.method.as_str(), &request.url);
    for (name, value) in &request.headers {
        req = req.set(name, value);
    }
    if let Some(timeout) = timeout {
        req = req.timeout(timeout);
    }

    let result = match &request.body {
        Some(body) => req.send_bytes(body),
        None => req.call(),
    };
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            trace!(url = %request.url, error = %transport, "ureq transport error");
            return Err(TransportError::Connection(transport.to_string()));
        }
    };

    Ok(HttpResponse {
        status: response.status(),
        status_text: response.status_text().to_string(),
        body: Box::new(response.into_reader()),
    })
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, ctx: &CallContext) -> Result<HttpResponse, TransportError> {
        let timeout = ctx.remaining().or(self.default_timeout);
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(TransportError::DeadlineExceeded);
        }

        let result = if ctx.is_cancelable() {
            self.exchange_cancelable(request, timeout, ctx)
        } else {
            exchange(&self.agent, request, timeout)
        };
        match result {
            Err(TransportError::Connection(message)) => {
                // a fired token or an expired deadline explains the failure better
                ctx.check()?;
                Err(TransportError::Connection(message))
            }
            other => other,
        }
    }
}
