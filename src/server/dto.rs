use serde::{Deserialize, Serialize};

use crate::types::{Cursor, DEFAULT_PAGE_LIMIT};

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MembershipRequest {
    #[serde(default)]
    pub metadata_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModifyMembershipRequest {
    pub op: String,
    #[serde(default)]
    pub metadata_ids: Vec<String>,
}

/// Query parameters shared by every keyset listing. `limit` is parsed
/// leniently: anything that is not a number in range falls back to the
/// default.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub after_id: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl PaginationParams {
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        Cursor::new(self.after_id.clone().unwrap_or_default(), limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListServersParams {
    /// App identifier; when present only that app's servers are listed.
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub after_id: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl ListServersParams {
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            after_id: self.after_id.clone(),
            limit: self.limit.clone(),
        }
    }
}

/// Discovery payload sent by agents. The server assigns the id.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverRequest {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub num_cpu: i64,
    pub kernel: String,
    pub uptime: String,
    pub total_memory_mb: i64,
    pub total_disk_size_gb: String,
    pub mounted_count: i64,
    pub timestamp_utc: String,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub count: usize,
}
