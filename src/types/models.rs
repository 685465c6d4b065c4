use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
    pub identifier: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an app. `name` is trimmed and `identifier` is slugified
/// by the store before anything is persisted.
#[derive(Debug, Clone, Default)]
pub struct NewApp {
    pub id: String,
    pub name: String,
    pub identifier: String,
    pub description: String,
}

/// A registered machine, as reported by the discovery agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a keyset listing. An empty `next_cursor` marks the last page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppServersPage {
    pub total: i64,
    pub next_cursor: String,
    pub items: Vec<Server>,
}
