//! Raw batch writes into a bucket's database.
//!
//! # Design
//! Entries are written as-is, bypassing bucketd's object semantics: the
//! caller builds the raw keys (versioned keys included) and values. The
//! request is always flagged idempotent since replaying a batch rewrites the
//! same keys.

use serde::Serialize;

use crate::client::{escape_segment, BucketClient, RequestOptions};
use crate::context::CallContext;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::types::PostBatchEntry;

#[derive(Serialize)]
struct BatchPayload<'a> {
    batch: &'a [PostBatchEntry],
}

impl BucketClient {
    /// Write low-level entries straight into the database of `bucket`.
    ///
    /// Always flagged idempotent: replaying the same batch writes the same
    /// keys again.
    pub fn post_batch(&self, ctx: &CallContext, bucket: &str, batch: &[PostBatchEntry]) -> Result<()> {
        const OP: &str = "PostBatch";
        let resource = format!("/default/batch/{}", escape_segment(bucket));
        let body = self.encode(OP, HttpMethod::Post, &resource, &BatchPayload { batch })?;
        self.request(
            ctx,
            OP,
            HttpMethod::Post,
            &resource,
            RequestOptions::new().json(body).idempotent(),
        )?;
        Ok(())
    }
}
