//! Administrative routes: raft session introspection and per-bucket knobs.
//!
//! Bucket names are always escaped here so that a name holding a `/` cannot
//! reach a different admin route.

use crate::client::{escape_segment, BucketClient, RequestOptions};
use crate::context::CallContext;
use crate::error::{ErrorKind, Result};
use crate::http::HttpMethod;
use crate::types::{BucketAccessMode, MemberInfo, SessionInfo, SessionLogResponse};

const RAFT_SESSIONS: &str = "/_/raft_sessions";

impl BucketClient {
    /// Raft session ID hosting `bucket`.
    pub fn admin_get_bucket_session_id(&self, ctx: &CallContext, bucket: &str) -> Result<u32> {
        const OP: &str = "AdminGetBucketSessionID";
        let resource = format!("/_/buckets/{}/id", escape_segment(bucket));
        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        let text = String::from_utf8_lossy(&body);
        text.trim().parse::<u32>().map_err(|_| {
            self.error(
                OP,
                HttpMethod::Get,
                &resource,
                ErrorKind::InvalidResponse(format!(
                    "bucketd did not return a valid session ID in response body: '{text}'"
                )),
            )
        })
    }

    pub fn admin_get_bucket_access_mode(&self, ctx: &CallContext, bucket: &str) -> Result<BucketAccessMode> {
        let resource = format!("/_/buckets/{}/accessMode", escape_segment(bucket));
        let body = self.request(ctx, "AdminGetBucketAccessMode", HttpMethod::Get, &resource, RequestOptions::new())?;
        Ok(BucketAccessMode::from(String::from_utf8_lossy(&body).trim()))
    }

    /// Switch `bucket` between read-write and read-only.
    pub fn admin_set_bucket_access_mode(
        &self,
        ctx: &CallContext,
        bucket: &str,
        mode: &BucketAccessMode,
    ) -> Result<()> {
        let resource = format!(
            "/_/buckets/{}/accessMode?mode={}",
            escape_segment(bucket),
            escape_segment(mode.as_str())
        );
        self.request(ctx, "AdminSetBucketAccessMode", HttpMethod::Put, &resource, RequestOptions::new())?;
        Ok(())
    }

    /// Drop bucketd's cached metastore entry for `bucket`, e.g. after moving
    /// it to another raft session.
    pub fn admin_bucket_refresh_cache(&self, ctx: &CallContext, bucket: &str) -> Result<()> {
        let resource = format!("/_/buckets/{}/refreshCache", escape_segment(bucket));
        self.request(ctx, "AdminBucketRefreshCache", HttpMethod::Get, &resource, RequestOptions::new())?;
        Ok(())
    }

    pub fn admin_get_all_sessions_info(&self, ctx: &CallContext) -> Result<Vec<SessionInfo>> {
        const OP: &str = "AdminGetAllSessionsInfo";
        let body = self.request(ctx, OP, HttpMethod::Get, RAFT_SESSIONS, RequestOptions::new())?;
        self.decode(OP, HttpMethod::Get, RAFT_SESSIONS, &body)
    }

    /// Info for one raft session.
    ///
    /// bucketd answers `/_/raft_sessions/{id}/info` with a 500 for unknown
    /// sessions, so all sessions are fetched and filtered instead; an unknown
    /// ID is reported as 404 `RaftSessionNotFound`.
    pub fn admin_get_session_info(&self, ctx: &CallContext, session_id: u32) -> Result<SessionInfo> {
        let sessions = self.admin_get_all_sessions_info(ctx)?;
        sessions
            .into_iter()
            .find(|session| session.id == session_id)
            .ok_or_else(|| {
                self.error(
                    "AdminGetSessionInfo",
                    HttpMethod::Get,
                    RAFT_SESSIONS,
                    ErrorKind::Status {
                        status: 404,
                        error_type: "RaftSessionNotFound".to_string(),
                        detail: Some(format!("no such raft session: {session_id}")),
                    },
                )
            })
    }

    pub fn admin_get_session_leader(&self, ctx: &CallContext, session_id: u32) -> Result<MemberInfo> {
        const OP: &str = "AdminGetSessionLeader";
        let resource = format!("{RAFT_SESSIONS}/{session_id}/leader");
        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        self.decode(OP, HttpMethod::Get, &resource, &body)
    }

    /// Up to `limit` raft oplog records of `session_id` starting at `begin`,
    /// read from the leader when `target_leader` is set, else from a follower.
    pub fn admin_get_session_log(
        &self,
        ctx: &CallContext,
        session_id: u32,
        begin: u64,
        limit: u32,
        target_leader: bool,
    ) -> Result<SessionLogResponse> {
        const OP: &str = "AdminGetSessionLog";
        let mut resource = format!("{RAFT_SESSIONS}/{session_id}/log?begin={begin}&limit={limit}");
        if target_leader {
            resource.push_str("&target_leader=true");
        }
        let body = self.request(ctx, OP, HttpMethod::Get, &resource, RequestOptions::new())?;
        self.decode(OP, HttpMethod::Get, &resource, &body)
    }
}
