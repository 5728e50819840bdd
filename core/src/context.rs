//! Per-call cancellation and deadlines.
//!
//! Every operation takes a `&CallContext`. The client checks it before
//! sending, once the response head is in, and between body chunks. While the
//! exchange is in flight the transport enforces it: `remaining()` bounds the
//! I/O and, when `is_cancelable()`, a fired token abandons the exchange
//! without waiting for bucketd.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::http::TransportError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    /// A context that never expires and cannot be canceled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    pub fn with_cancel(token: CancellationToken) -> Self {
        Self {
            deadline: None,
            cancel: Some(token),
        }
    }

    /// Attach a cancellation token to this context, keeping its deadline.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Tighten the deadline to at most `timeout` from now.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether a token can cut this call short.
    pub fn is_cancelable(&self) -> bool {
        self.cancel.is_some()
    }

    /// `Err` once the token has fired or the deadline has passed.
    pub fn check(&self) -> Result<(), TransportError> {
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(TransportError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TransportError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Wrap `inner` so that every read first checks this context.
    pub(crate) fn guard_reader<R: Read>(&self, inner: R) -> GuardedReader<'_, R> {
        GuardedReader { ctx: self, inner }
    }
}

pub(crate) struct GuardedReader<'a, R> {
    ctx: &'a CallContext,
    inner: R,
}

impl<R: Read> Read for GuardedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // not ErrorKind::Interrupted: read_to_end would retry it forever
        self.ctx.check().map_err(io::Error::other)?;
        self.inner.read(buf)
    }
}
