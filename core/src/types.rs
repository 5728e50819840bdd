//! Wire DTOs exchanged with bucketd.
//!
//! # Design
//! Field names follow bucketd's JSON exactly (a mix of camelCase, snake_case
//! and PascalCase depending on the route). The mock-bucketd crate defines its
//! own copies; the end-to-end tests catch schema drift between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One raw entry of a `PostBatch` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBatchEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// `"del"` for deletions, empty for puts.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub entry_type: String,
}

impl PostBatchEntry {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            entry_type: String::new(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            entry_type: "del".to_string(),
        }
    }
}

/// Metastore record describing where a bucket lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetastoreEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub creating: bool,
    #[serde(default)]
    pub deleting: bool,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "raftSessionID")]
    pub raft_session_id: u32,
    #[serde(default)]
    pub version: i64,
    #[serde(default, rename = "raftSession")]
    pub raft_session: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, rename = "adminPort")]
    pub admin_port: u16,
    #[serde(default, rename = "mdClusterId")]
    pub md_cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: u32,
    #[serde(default, rename = "raftMembers")]
    pub raft_members: Vec<MemberInfo>,
    #[serde(default, rename = "connectedToLeader")]
    pub connected_to_leader: bool,
}

/// Access mode of a bucket as reported by the admin routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketAccessMode {
    ReadWrite,
    /// Writes are refused with 503 ServiceUnavailable.
    ReadOnly,
    Other(String),
}

impl BucketAccessMode {
    pub fn as_str(&self) -> &str {
        match self {
            BucketAccessMode::ReadWrite => "read-write",
            BucketAccessMode::ReadOnly => "read-only",
            BucketAccessMode::Other(mode) => mode,
        }
    }
}

impl From<&str> for BucketAccessMode {
    fn from(mode: &str) -> Self {
        match mode {
            "read-write" => BucketAccessMode::ReadWrite,
            "read-only" => BucketAccessMode::ReadOnly,
            other => BucketAccessMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BucketAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database method code found in raft oplog records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum DbMethod {
    Create,
    Delete,
    Get,
    Put,
    List,
    Del,
    GetAttributes,
    PutAttributes,
    Batch,
    Noop,
    Unknown(i32),
}

impl From<i32> for DbMethod {
    fn from(code: i32) -> Self {
        match code {
            0 => DbMethod::Create,
            1 => DbMethod::Delete,
            2 => DbMethod::Get,
            3 => DbMethod::Put,
            4 => DbMethod::List,
            5 => DbMethod::Del,
            6 => DbMethod::GetAttributes,
            7 => DbMethod::PutAttributes,
            8 => DbMethod::Batch,
            9 => DbMethod::Noop,
            other => DbMethod::Unknown(other),
        }
    }
}

impl From<DbMethod> for i32 {
    fn from(method: DbMethod) -> Self {
        match method {
            DbMethod::Create => 0,
            DbMethod::Delete => 1,
            DbMethod::Get => 2,
            DbMethod::Put => 3,
            DbMethod::List => 4,
            DbMethod::Del => 5,
            DbMethod::GetAttributes => 6,
            DbMethod::PutAttributes => 7,
            DbMethod::Batch => 8,
            DbMethod::Noop => 9,
            DbMethod::Unknown(code) => code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogInfo {
    pub start: i64,
    pub cseq: i64,
    pub prune: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type")]
    pub entry_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogRecord {
    #[serde(rename = "db")]
    pub bucket: String,
    pub method: DbMethod,
    #[serde(default)]
    pub entries: Vec<SessionLogEntry>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogResponse {
    pub info: SessionLogInfo,
    #[serde(default)]
    pub log: Vec<SessionLogRecord>,
}
