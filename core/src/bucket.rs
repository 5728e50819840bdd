//! Bucket lifecycle and attribute operations.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{escape_segment, with_query, BucketClient, RequestOptions};
use crate::context::CallContext;
use crate::error::{ErrorKind, Result};
use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateBucketOptions {
    /// Raft session the bucket must land on; bucketd picks one when unset.
    pub session_id: Option<u32>,
    /// Treat a 409 Conflict as success when the existing bucket carries the
    /// same non-empty `uid` attribute as the one being created.
    pub make_idempotent: bool,
}

impl CreateBucketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn make_idempotent(mut self) -> Self {
        self.make_idempotent = true;
        self
    }
}

#[derive(Serialize)]
struct CreateQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    raftsession: Option<u32>,
}

/// `uid` attribute of a bucket attributes blob. Unparsable JSON has none.
fn attributes_uid(attributes: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct Uid {
        #[serde(default)]
        uid: Option<String>,
    }
    serde_json::from_slice::<Uid>(attributes)
        .ok()
        .and_then(|parsed| parsed.uid)
        .filter(|uid| !uid.is_empty())
}

/// Whether two attribute blobs describe the same bucket instance.
pub fn bucket_attribute_uids_match(attributes1: &[u8], attributes2: &[u8]) -> bool {
    match (attributes_uid(attributes1), attributes_uid(attributes2)) {
        (Some(uid1), Some(uid2)) => uid1 == uid2,
        _ => false,
    }
}

impl BucketClient {
    /// Create `bucket` with the given JSON attributes.
    ///
    /// With `make_idempotent`, the request is flagged as replayable and a
    /// 409 Conflict is resolved by reading the existing bucket's attributes:
    /// matching `uid`s mean an earlier attempt of ours already created it, so
    /// the call succeeds without touching it. Any other conflict is returned
    /// unchanged.
    pub fn create_bucket(
        &self,
        ctx: &CallContext,
        bucket: &str,
        attributes: &[u8],
        options: CreateBucketOptions,
    ) -> Result<()> {
        const OP: &str = "CreateBucket";
        let base = format!("/default/bucket/{}", escape_segment(bucket));
        let query = CreateQuery {
            raftsession: options.session_id.filter(|id| *id > 0),
        };
        let resource = with_query(base.clone(), &query)
            .map_err(|msg| self.error(OP, HttpMethod::Post, &base, ErrorKind::InvalidArgument(msg)))?;

        let mut request_options = RequestOptions::new().json(attributes);
        if options.make_idempotent {
            request_options = request_options.idempotent();
        }
        let conflict = match self.request(ctx, OP, HttpMethod::Post, &resource, request_options) {
            Ok(_) => return Ok(()),
            Err(err) if options.make_idempotent && err.is_conflict() => err,
            Err(err) => return Err(err),
        };

        let existing = self.get_bucket_attributes(ctx, bucket)?;
        if bucket_attribute_uids_match(attributes, &existing) {
            info!(bucket, "bucket already exists with the same uid, create treated as success");
            return Ok(());
        }
        Err(conflict)
    }

    pub fn delete_bucket(&self, ctx: &CallContext, bucket: &str) -> Result<()> {
        let resource = format!("/default/bucket/{}", escape_segment(bucket));
        self.request(ctx, "DeleteBucket", HttpMethod::Delete, &resource, RequestOptions::new())?;
        Ok(())
    }

    /// Raw JSON attributes blob of `bucket`.
    pub fn get_bucket_attributes(&self, ctx: &CallContext, bucket: &str) -> Result<Vec<u8>> {
        let resource = format!("/default/attributes/{}", escape_segment(bucket));
        self.request(ctx, "GetBucketAttributes", HttpMethod::Get, &resource, RequestOptions::new())
    }

    /// Replace the attributes blob of `bucket`.
    pub fn put_bucket_attributes(&self, ctx: &CallContext, bucket: &str, attributes: &[u8]) -> Result<()> {
        let resource = format!("/default/attributes/{}", escape_segment(bucket));
        self.request(
            ctx,
            "PutBucketAttributes",
            HttpMethod::Post,
            &resource,
            RequestOptions::new().body(attributes),
        )?;
        Ok(())
    }
}
