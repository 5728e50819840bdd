//! Metastore entries: the per-bucket record telling bucketd which raft
//! session hosts a bucket.

use crate::client::{escape_segment, BucketClient, RequestOptions};
use crate::context::CallContext;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::types::MetastoreEntry;

fn metastore_resource(bucket: &str) -> String {
    format!("/default/metastore/db/{}", escape_segment(bucket))
}

impl BucketClient {
    /// Create or overwrite the metastore entry of `bucket`.
    pub fn create_metastore_entry(&self, ctx: &CallContext, bucket: &str, entry: &MetastoreEntry) -> Result<()> {
        const OP: &str = "CreateMetastoreEntry";
        let resource = metastore_resource(bucket);
        let body = self.encode(OP, HttpMethod::Post, &resource, entry)?;
        self.request(ctx, OP, HttpMethod::Post, &resource, RequestOptions::new().json(body))?;
        Ok(())
    }

    pub fn get_metastore_entry(&self, ctx: &CallContext, bucket: &str) -> Result<MetastoreEntry> {
        const OP: &str = "GetMetastoreEntry";
        let resource = metastore_resource(bucket);
        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        self.decode(OP, HttpMethod::Get, &resource, &body)
    }

    pub fn delete_metastore_entry(&self, ctx: &CallContext, bucket: &str) -> Result<()> {
        let resource = metastore_resource(bucket);
        self.request(ctx, "DeleteMetastoreEntry", HttpMethod::Delete, &resource, RequestOptions::new())?;
        Ok(())
    }
}
