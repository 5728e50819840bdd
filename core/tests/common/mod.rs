//! Scripted bucketd used by the operation tests.
//!
//! Responders are registered per `"METHOD /resource?query"`; anything else
//! fails at the transport level with "no responder found", so a test only
//! passes if the client hits exactly the URL it registered.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bucketclient::{BucketClient, CallContext, HttpRequest, HttpResponse, TransportError};

pub const ENDPOINT: &str = "http://localhost:9000";

struct Reply {
    status: u16,
    reason: String,
    body: String,
}

#[derive(Default)]
pub struct ScriptedBucketd {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedBucketd {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, resource: &str, status: u16, body: &str) {
        self.reply_with_reason(method, resource, status, "", body);
    }

    pub fn reply_with_reason(&self, method: &str, resource: &str, status: u16, reason: &str, body: &str) {
        self.replies.lock().unwrap().insert(
            format!("{method} {resource}"),
            Reply {
                status,
                reason: reason.to_string(),
                body: body.to_string(),
            },
        );
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn client(self: &Arc<Self>) -> BucketClient {
        let bucketd = Arc::clone(self);
        BucketClient::with_transport(ENDPOINT, move |req: &HttpRequest, _ctx: &CallContext| {
            bucketd.handle(req)
        })
    }

    fn handle(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(req.clone());
        let resource = req.url.strip_prefix(ENDPOINT).unwrap_or(&req.url);
        let key = format!("{} {}", req.method, resource);
        match self.replies.lock().unwrap().get(&key) {
            Some(reply) => Ok(HttpResponse::new(reply.status, reply.reason.clone(), reply.body.clone())),
            None => Err(TransportError::Connection(format!("no responder found for {key}"))),
        }
    }
}

pub fn ctx() -> CallContext {
    CallContext::background()
}

pub fn body_text(req: &HttpRequest) -> String {
    String::from_utf8(req.body.clone().unwrap_or_default()).unwrap()
}
