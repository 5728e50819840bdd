//! Bucket listings: raw key/value ranges and versioned listings.
//!
//! bucketd has no way to stop a versioned listing at an upper bound, so
//! `ListObjectVersionsOptions::last_marker` is enforced here after the
//! response comes back, see [`truncate_versions_response`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{escape_segment, with_query, BucketClient, RequestOptions};
use crate::context::CallContext;
use crate::error::{ErrorKind, Result};
use crate::http::HttpMethod;

pub const MAX_KEYS_LIMIT: u32 = 10_000;

/// Composite listing cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionMarker {
    pub key: String,
    pub version_id: String,
}

impl VersionMarker {
    pub fn new(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
        }
    }
}

impl Ord for VersionMarker {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_version_markers(&self.key, &self.version_id, &other.key, &other.version_id)
    }
}

impl PartialOrd for VersionMarker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order `(key1, version_id1)` against `(key2, version_id2)`.
///
/// Keys compare byte-wise; version IDs only break ties between equal keys.
/// This is the order bucketd returns versioned entries in.
pub fn compare_version_markers(key1: &str, version_id1: &str, key2: &str, version_id2: &str) -> Ordering {
    key1.as_bytes()
        .cmp(key2.as_bytes())
        .then_with(|| version_id1.as_bytes().cmp(version_id2.as_bytes()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectVersionsEntry {
    pub key: String,
    #[serde(rename = "versionId", default)]
    pub version_id: String,
    #[serde(default)]
    pub value: String,
}

impl ListObjectVersionsEntry {
    fn cmp_marker(&self, marker: &VersionMarker) -> Ordering {
        compare_version_markers(&self.key, &self.version_id, &marker.key, &marker.version_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectVersionsResponse {
    #[serde(default)]
    pub versions: Vec<ListObjectVersionsEntry>,
    #[serde(default)]
    pub common_prefixes: Vec<String>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_version_id_marker: Option<String>,
}

impl ListObjectVersionsResponse {
    /// Continuation cursor; only meaningful while `is_truncated` holds.
    pub fn next_marker(&self) -> Option<VersionMarker> {
        if !self.is_truncated {
            return None;
        }
        Some(VersionMarker::new(
            self.next_key_marker.clone().unwrap_or_default(),
            self.next_version_id_marker.clone().unwrap_or_default(),
        ))
    }
}

/// Make `response` look as if nothing sorts strictly after `last`.
///
/// A truncated response whose cursor is still below `last` is left alone.
/// Otherwise trailing entries beyond `last` are dropped and the truncation
/// flag and cursor are cleared, `last` being the caller's horizon. Entries
/// are assumed to be in [`compare_version_markers`] order.
pub fn truncate_versions_response(response: &mut ListObjectVersionsResponse, last: &VersionMarker) {
    if let Some(next) = response.next_marker() {
        if next < *last {
            return;
        }
    }
    let keep = response
        .versions
        .iter()
        .rposition(|entry| entry.cmp_marker(last) != Ordering::Greater)
        .map_or(0, |i| i + 1);
    if keep < response.versions.len() {
        debug!(
            dropped = response.versions.len() - keep,
            last_key = %last.key,
            last_version_id = %last.version_id,
            "truncating versions listing at last marker"
        );
        response.versions.truncate(keep);
    }
    response.is_truncated = false;
    response.next_key_marker = None;
    response.next_version_id_marker = None;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectVersionsOptions {
    /// Start listing strictly after this cursor.
    pub marker: Option<VersionMarker>,
    /// At most this many entries, in `0..=10000`.
    pub max_keys: Option<u32>,
    /// Behave as if nothing sorts strictly after this cursor.
    pub last_marker: Option<VersionMarker>,
}

impl ListObjectVersionsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(mut self, key: impl Into<String>, version_id: impl Into<String>) -> Self {
        self.marker = Some(VersionMarker::new(key, version_id));
        self
    }

    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn last_marker(mut self, key: impl Into<String>, version_id: impl Into<String>) -> Self {
        self.last_marker = Some(VersionMarker::new(key, version_id));
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_max_keys(self.max_keys)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionsQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key_marker: Option<&'a str>,
    listing_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_keys: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id_marker: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBasicEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Range bounds and output trimming for [`BucketClient::list_basic`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBasicOptions {
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    /// Defaults to, and is capped at, 10000 on the bucketd side.
    pub max_keys: Option<u32>,
    /// Keys are not needed and may come back empty.
    pub no_keys: bool,
    /// Values are not needed and may come back empty.
    pub no_values: bool,
}

impl ListBasicOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, key: impl Into<String>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn gte(mut self, key: impl Into<String>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<String>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<String>) -> Self {
        self.lte = Some(key.into());
        self
    }

    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn no_keys(mut self) -> Self {
        self.no_keys = true;
        self
    }

    pub fn no_values(mut self) -> Self {
        self.no_values = true;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_max_keys(self.max_keys)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BasicQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    gt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gte: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<&'static str>,
    listing_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lte: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_keys: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'static str>,
}

fn validate_max_keys(max_keys: Option<u32>) -> std::result::Result<(), String> {
    match max_keys {
        Some(n) if n > MAX_KEYS_LIMIT => Err(format!(
            "maxKeys={n} is out of the valid range [0, {MAX_KEYS_LIMIT}]"
        )),
        _ => Ok(()),
    }
}

impl BucketClient {
    /// List object versions of `bucket` in key/versionId order.
    pub fn list_object_versions(
        &self,
        ctx: &CallContext,
        bucket: &str,
        options: &ListObjectVersionsOptions,
    ) -> Result<ListObjectVersionsResponse> {
        const OP: &str = "ListObjectVersions";
        let base = format!("/default/bucket/{}", escape_segment(bucket));
        options
            .validate()
            .map_err(|msg| self.error(OP, HttpMethod::Get, &base, ErrorKind::InvalidArgument(msg)))?;

        let query = VersionsQuery {
            key_marker: options.marker.as_ref().map(|m| m.key.as_str()),
            listing_type: "DelimiterVersions",
            max_keys: options.max_keys,
            version_id_marker: options.marker.as_ref().map(|m| m.version_id.as_str()),
        };
        let resource = with_query(base.clone(), &query)
            .map_err(|msg| self.error(OP, HttpMethod::Get, &base, ErrorKind::InvalidArgument(msg)))?;

        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        let mut response: ListObjectVersionsResponse = self.decode(OP, HttpMethod::Get, &resource, &body)?;
        if let Some(last) = &options.last_marker {
            truncate_versions_response(&mut response, last);
        }
        Ok(response)
    }

    /// List raw key/value pairs of `bucket` within the given bounds.
    pub fn list_basic(
        &self,
        ctx: &CallContext,
        bucket: &str,
        options: &ListBasicOptions,
    ) -> Result<Vec<ListBasicEntry>> {
        const OP: &str = "ListBasic";
        let base = format!("/default/bucket/{}", escape_segment(bucket));
        options
            .validate()
            .map_err(|msg| self.error(OP, HttpMethod::Get, &base, ErrorKind::InvalidArgument(msg)))?;

        let query = BasicQuery {
            gt: options.gt.as_deref(),
            gte: options.gte.as_deref(),
            keys: options.no_keys.then_some("false"),
            listing_type: "Basic",
            lt: options.lt.as_deref(),
            lte: options.lte.as_deref(),
            max_keys: options.max_keys,
            values: options.no_values.then_some("false"),
        };
        let resource = with_query(base.clone(), &query)
            .map_err(|msg| self.error(OP, HttpMethod::Get, &base, ErrorKind::InvalidArgument(msg)))?;

        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        self.decode(OP, HttpMethod::Get, &resource, &body)
    }
}
