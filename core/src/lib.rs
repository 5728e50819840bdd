//! Blocking client for bucketd, the metadata service.
//!
//! # Overview
//! Every typed operation turns into exactly one HTTP exchange (idempotent
//! bucket creation may add a read) and returns either a typed result or a
//! [`BucketClientError`] describing what failed and where.
//!
//! # Design
//! - `BucketClient` owns its [`Transport`]; [`UreqTransport`] is the default,
//!   anything implementing the trait can stand in for it.
//! - Cancellation and deadlines travel with each call in a [`CallContext`].
//! - No retries and no caching: callers decide what to do with an error.
//! - Versioned listings can be capped at a client-side "last marker", and
//!   bucket creation can reconcile a conflict with a previous attempt of the
//!   same bucket (`uid` match).

pub mod admin;
pub mod batch;
pub mod bucket;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod listing;
pub mod metastore;
pub mod transport;
pub mod types;

pub use bucket::{bucket_attribute_uids_match, CreateBucketOptions};
pub use client::{BucketClient, RequestOptions, IDEMPOTENCY_HEADER};
pub use config::ClientConfig;
pub use context::CallContext;
pub use error::{BucketClientError, ErrorKind, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use listing::{
    compare_version_markers, truncate_versions_response, ListBasicEntry, ListBasicOptions,
    ListObjectVersionsEntry, ListObjectVersionsOptions, ListObjectVersionsResponse, VersionMarker,
};
pub use tokio_util::sync::CancellationToken;
pub use transport::UreqTransport;
pub use types::{
    BucketAccessMode, DbMethod, MemberInfo, MetastoreEntry, PostBatchEntry, SessionInfo, SessionLogEntry,
    SessionLogInfo, SessionLogRecord, SessionLogResponse,
};
