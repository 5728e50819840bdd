//! In-memory stand-in for bucketd.
//!
//! Implements the routes the client talks to, with enough behavior to
//! exercise it end to end: conflicts on re-creation, 404s on missing buckets,
//! read-only buckets refusing writes, paginated listings and a per raft
//! session operation log.
//!
//! Versioned objects are stored as raw keys `"{key}\0{versionId}"`; since
//! `\0` sorts before every other byte, raw key order is key/versionId order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const VERSION_SEPARATOR: char = '\0';
const DEFAULT_MAX_KEYS: usize = 10_000;

const METHOD_CREATE: i32 = 0;
const METHOD_DELETE: i32 = 1;
const METHOD_PUT_ATTRIBUTES: i32 = 7;
const METHOD_BATCH: i32 = 8;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub host: String,
    pub port: u16,
    #[serde(rename = "adminPort")]
    pub admin_port: u16,
    #[serde(rename = "mdClusterId")]
    pub md_cluster_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: u32,
    #[serde(rename = "raftMembers")]
    pub raft_members: Vec<MemberInfo>,
    #[serde(rename = "connectedToLeader")]
    pub connected_to_leader: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub entry_type: String,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub batch: Vec<BatchEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub db: String,
    pub method: i32,
    pub entries: Vec<BatchEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogInfo {
    pub start: u64,
    pub cseq: u64,
    pub prune: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogResponse {
    pub info: LogInfo,
    pub log: Vec<LogRecord>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionEntry {
    pub key: String,
    #[serde(rename = "versionId")]
    pub version_id: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct VersionsListing {
    pub versions: Vec<VersionEntry>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version_id_marker: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicEntry {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct Bucket {
    pub attributes: Bytes,
    pub raft_session: u32,
    pub read_only: bool,
    pub objects: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct Backend {
    pub buckets: HashMap<String, Bucket>,
    pub metastore: HashMap<String, Value>,
    pub sessions: Vec<SessionInfo>,
    pub logs: HashMap<u32, Vec<LogRecord>>,
}

impl Default for Backend {
    fn default() -> Self {
        let sessions = (1..=2)
            .map(|id| SessionInfo {
                id,
                raft_members: vec![MemberInfo {
                    id: id * 10,
                    name: "md1-cluster1".to_string(),
                    display_name: "127.0.0.1 (md1-cluster1)".to_string(),
                    host: "127.0.0.1".to_string(),
                    port: 4200 + id as u16,
                    admin_port: 4250 + id as u16,
                    md_cluster_id: "1".to_string(),
                }],
                connected_to_leader: id == 1,
            })
            .collect();
        Self {
            buckets: HashMap::new(),
            metastore: HashMap::new(),
            sessions,
            logs: HashMap::new(),
        }
    }
}

impl Backend {
    fn has_session(&self, id: u32) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    fn append_log(&mut self, session: u32, db: &str, method: i32, entries: Vec<BatchEntry>) {
        self.logs.entry(session).or_default().push(LogRecord {
            db: db.to_string(),
            method,
            entries,
        });
    }

    fn writable_bucket(&mut self, name: &str) -> Result<&mut Bucket, StatusCode> {
        let bucket = self.buckets.get_mut(name).ok_or(StatusCode::NOT_FOUND)?;
        if bucket.read_only {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Ok(bucket)
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over a caller-owned backend, so tests can seed or inspect it.
pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route(
            "/default/bucket/{name}",
            get(list_bucket).post(create_bucket).delete(delete_bucket),
        )
        .route("/default/attributes/{name}", get(get_attributes).post(put_attributes))
        .route("/default/batch/{name}", axum::routing::post(post_batch))
        .route(
            "/default/metastore/db/{name}",
            get(get_metastore_entry)
                .post(put_metastore_entry)
                .delete(delete_metastore_entry),
        )
        .route("/_/buckets/{name}/id", get(get_bucket_session_id))
        .route(
            "/_/buckets/{name}/accessMode",
            get(get_access_mode).put(set_access_mode),
        )
        .route("/_/buckets/{name}/refreshCache", get(refresh_cache))
        .route("/_/raft_sessions", get(list_sessions))
        .route("/_/raft_sessions/{id}/leader", get(get_session_leader))
        .route("/_/raft_sessions/{id}/log", get(get_session_log))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- buckets ---

#[derive(Deserialize)]
struct CreateQuery {
    raftsession: Option<u32>,
}

async fn create_bucket(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<CreateQuery>,
    attributes: Bytes,
) -> StatusCode {
    let mut backend = db.write().await;
    if backend.buckets.contains_key(&name) {
        debug!(bucket = %name, "create refused, bucket exists");
        return StatusCode::CONFLICT;
    }
    let session = query.raftsession.unwrap_or(1);
    if !backend.has_session(session) {
        return StatusCode::BAD_REQUEST;
    }
    let logged = BatchEntry {
        value: String::from_utf8_lossy(&attributes).into_owned(),
        ..Default::default()
    };
    backend.buckets.insert(
        name.clone(),
        Bucket {
            attributes,
            raft_session: session,
            read_only: false,
            objects: BTreeMap::new(),
        },
    );
    backend.append_log(session, &name, METHOD_CREATE, vec![logged]);
    info!(bucket = %name, session, "bucket created");
    StatusCode::OK
}

async fn delete_bucket(State(db): State<Db>, Path(name): Path<String>) -> StatusCode {
    let mut backend = db.write().await;
    match backend.buckets.remove(&name) {
        Some(bucket) => {
            backend.append_log(bucket.raft_session, &name, METHOD_DELETE, Vec::new());
            info!(bucket = %name, "bucket deleted");
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn get_attributes(State(db): State<Db>, Path(name): Path<String>) -> Result<Bytes, StatusCode> {
    let backend = db.read().await;
    backend
        .buckets
        .get(&name)
        .map(|b| b.attributes.clone())
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_attributes(
    State(db): State<Db>,
    Path(name): Path<String>,
    attributes: Bytes,
) -> Result<StatusCode, StatusCode> {
    let mut backend = db.write().await;
    let bucket = backend.writable_bucket(&name)?;
    bucket.attributes = attributes.clone();
    let session = bucket.raft_session;
    let logged = BatchEntry {
        value: String::from_utf8_lossy(&attributes).into_owned(),
        ..Default::default()
    };
    backend.append_log(session, &name, METHOD_PUT_ATTRIBUTES, vec![logged]);
    Ok(StatusCode::OK)
}

async fn post_batch(
    State(db): State<Db>,
    Path(name): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Result<StatusCode, StatusCode> {
    let mut backend = db.write().await;
    let bucket = backend.writable_bucket(&name)?;
    for entry in &request.batch {
        if entry.entry_type == "del" {
            bucket.objects.remove(&entry.key);
        } else {
            bucket.objects.insert(entry.key.clone(), entry.value.clone());
        }
    }
    let session = bucket.raft_session;
    debug!(bucket = %name, entries = request.batch.len(), "batch applied");
    backend.append_log(session, &name, METHOD_BATCH, request.batch);
    Ok(StatusCode::OK)
}

// --- listings ---

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    listing_type: Option<String>,
    key_marker: Option<String>,
    version_id_marker: Option<String>,
    max_keys: Option<usize>,
    gt: Option<String>,
    gte: Option<String>,
    lt: Option<String>,
    lte: Option<String>,
    keys: Option<String>,
    values: Option<String>,
}

async fn list_bucket(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, StatusCode> {
    let backend = db.read().await;
    let bucket = backend.buckets.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    let max_keys = query.max_keys.unwrap_or(DEFAULT_MAX_KEYS);
    if max_keys > DEFAULT_MAX_KEYS {
        return Err(StatusCode::BAD_REQUEST);
    }
    let listing = match query.listing_type.as_deref() {
        Some("DelimiterVersions") => serde_json::to_value(list_versions(bucket, &query, max_keys)),
        Some("Basic") => serde_json::to_value(list_basic(bucket, &query, max_keys)),
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    listing.map(Json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn split_version(raw: &str) -> (&str, &str) {
    raw.split_once(VERSION_SEPARATOR).unwrap_or((raw, ""))
}

fn list_versions(bucket: &Bucket, query: &ListQuery, max_keys: usize) -> VersionsListing {
    let marker = query.key_marker.as_deref().map(|key| {
        (key, query.version_id_marker.as_deref().unwrap_or(""))
    });
    let mut remaining = bucket
        .objects
        .iter()
        .map(|(raw, value)| (split_version(raw), value))
        .filter(|(pair, _)| marker.map_or(true, |m| *pair > m));

    let versions: Vec<VersionEntry> = remaining
        .by_ref()
        .take(max_keys)
        .map(|((key, version_id), value)| VersionEntry {
            key: key.to_string(),
            version_id: version_id.to_string(),
            value: value.clone(),
        })
        .collect();
    let is_truncated = !versions.is_empty() && remaining.next().is_some();
    let last = versions.last().filter(|_| is_truncated);
    VersionsListing {
        next_key_marker: last.map(|e| e.key.clone()),
        next_version_id_marker: last.map(|e| e.version_id.clone()),
        versions,
        common_prefixes: Vec::new(),
        is_truncated,
    }
}

fn list_basic(bucket: &Bucket, query: &ListQuery, max_keys: usize) -> Vec<BasicEntry> {
    let in_range = |key: &str| {
        query.gt.as_deref().map_or(true, |b| key > b)
            && query.gte.as_deref().map_or(true, |b| key >= b)
            && query.lt.as_deref().map_or(true, |b| key < b)
            && query.lte.as_deref().map_or(true, |b| key <= b)
    };
    let with_keys = query.keys.as_deref() != Some("false");
    let with_values = query.values.as_deref() != Some("false");
    bucket
        .objects
        .iter()
        .filter(|(key, _)| in_range(key))
        .take(max_keys)
        .map(|(key, value)| BasicEntry {
            key: if with_keys { key.clone() } else { String::new() },
            value: if with_values { value.clone() } else { String::new() },
        })
        .collect()
}

// --- metastore ---

async fn get_metastore_entry(State(db): State<Db>, Path(name): Path<String>) -> Result<Json<Value>, StatusCode> {
    let backend = db.read().await;
    backend.metastore.get(&name).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn put_metastore_entry(State(db): State<Db>, Path(name): Path<String>, Json(entry): Json<Value>) -> StatusCode {
    db.write().await.metastore.insert(name, entry);
    StatusCode::OK
}

async fn delete_metastore_entry(State(db): State<Db>, Path(name): Path<String>) -> StatusCode {
    match db.write().await.metastore.remove(&name) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

// --- admin ---

async fn get_bucket_session_id(State(db): State<Db>, Path(name): Path<String>) -> Result<String, StatusCode> {
    let backend = db.read().await;
    backend
        .buckets
        .get(&name)
        .map(|b| b.raft_session.to_string())
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_access_mode(State(db): State<Db>, Path(name): Path<String>) -> Result<&'static str, StatusCode> {
    let backend = db.read().await;
    let bucket = backend.buckets.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(if bucket.read_only { "read-only" } else { "read-write" })
}

#[derive(Deserialize)]
struct AccessModeQuery {
    mode: String,
}

async fn set_access_mode(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<AccessModeQuery>,
) -> StatusCode {
    let read_only = match query.mode.as_str() {
        "read-only" => true,
        "read-write" => false,
        _ => return StatusCode::BAD_REQUEST,
    };
    let mut backend = db.write().await;
    match backend.buckets.get_mut(&name) {
        Some(bucket) => {
            bucket.read_only = read_only;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn refresh_cache(State(db): State<Db>, Path(name): Path<String>) -> StatusCode {
    if db.read().await.buckets.contains_key(&name) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn list_sessions(State(db): State<Db>) -> Json<Vec<SessionInfo>> {
    Json(db.read().await.sessions.clone())
}

async fn get_session_leader(State(db): State<Db>, Path(id): Path<u32>) -> Result<Json<MemberInfo>, StatusCode> {
    let backend = db.read().await;
    backend
        .sessions
        .iter()
        .find(|s| s.id == id)
        .and_then(|s| s.raft_members.first().cloned())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Deserialize)]
struct LogQuery {
    begin: u64,
    limit: u64,
    #[serde(default)]
    #[allow(dead_code)]
    target_leader: Option<bool>,
}

async fn get_session_log(
    State(db): State<Db>,
    Path(id): Path<u32>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogResponse>, StatusCode> {
    let backend = db.read().await;
    if !backend.has_session(id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let log = backend.logs.get(&id).map(Vec::as_slice).unwrap_or_default();
    let cseq = log.len() as u64;
    let begin = query.begin.max(1);
    if begin > cseq + 1 {
        return Err(StatusCode::RANGE_NOT_SATISFIABLE);
    }
    let start = (begin - 1) as usize;
    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
    let end = start.saturating_add(limit).min(log.len());
    Ok(Json(LogResponse {
        info: LogInfo {
            start: begin,
            cseq,
            prune: 1,
        },
        log: log[start..end].to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_with(keys: &[&str]) -> Bucket {
        Bucket {
            attributes: Bytes::new(),
            raft_session: 1,
            read_only: false,
            objects: keys.iter().map(|k| (k.to_string(), format!("v:{k}"))).collect(),
        }
    }

    #[test]
    fn versions_page_reports_last_entry_as_cursor() {
        let bucket = bucket_with(&["a\u{0}1", "a\u{0}2", "b\u{0}1"]);
        let query = ListQuery::default();
        let page = list_versions(&bucket, &query, 2);
        assert_eq!(page.versions.len(), 2);
        assert!(page.is_truncated);
        assert_eq!(page.next_key_marker.as_deref(), Some("a"));
        assert_eq!(page.next_version_id_marker.as_deref(), Some("2"));
    }

    #[test]
    fn versions_marker_is_exclusive() {
        let bucket = bucket_with(&["a\u{0}1", "a\u{0}2", "b\u{0}1"]);
        let query = ListQuery {
            key_marker: Some("a".to_string()),
            version_id_marker: Some("2".to_string()),
            ..Default::default()
        };
        let page = list_versions(&bucket, &query, 10);
        assert_eq!(page.versions.len(), 1);
        assert_eq!(page.versions[0].key, "b");
        assert!(!page.is_truncated);
        assert!(page.next_key_marker.is_none());
    }

    #[test]
    fn basic_listing_honors_bounds_and_trimming() {
        let bucket = bucket_with(&["a", "b", "c", "d"]);
        let query = ListQuery {
            gt: Some("a".to_string()),
            lte: Some("c".to_string()),
            values: Some("false".to_string()),
            ..Default::default()
        };
        let entries = list_basic(&bucket, &query, 10);
        assert_eq!(
            entries,
            vec![
                BasicEntry { key: "b".to_string(), value: String::new() },
                BasicEntry { key: "c".to_string(), value: String::new() },
            ]
        );
    }

    #[test]
    fn listing_serializes_with_bucketd_field_names() {
        let json = serde_json::to_value(VersionsListing::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Versions": [], "CommonPrefixes": [], "IsTruncated": false})
        );
    }

    #[test]
    fn default_backend_has_two_sessions() {
        let backend = Backend::default();
        assert_eq!(backend.sessions.len(), 2);
        assert!(backend.has_session(2));
        assert!(!backend.has_session(3));
    }
}
