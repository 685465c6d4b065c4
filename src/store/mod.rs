pub mod deadline;
pub mod page;
pub mod reconcile;
mod schema;
pub mod slug;
mod sqlite;

pub use deadline::OPERATION_TIMEOUT;
pub use slug::slugify;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Rows per statement for bulk membership writes.
pub const MEMBERSHIP_BATCH_SIZE: usize = 500;

/// Store defines the database interface.
///
/// Every call runs under [`OPERATION_TIMEOUT`] and multi-statement mutations
/// are atomic.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // App operations
    fn create_app(&self, new: NewApp) -> Result<App>;
    fn find_app(&self, selector: &AppSelector) -> Result<App>;
    fn list_apps(&self, after_id: &str, limit: i64) -> Result<Page<App>>;
    fn delete_app(&self, selector: &AppSelector) -> Result<()>;

    // App-Server M2M operations
    fn modify_app_servers(
        &self,
        selector: &AppSelector,
        server_ids: &[String],
        op: MembershipOp,
    ) -> Result<()>;
    fn list_app_servers(&self, selector: &AppSelector, cursor: &Cursor)
    -> Result<AppServersPage>;

    // Server (metadata) operations
    fn create_server(&self, server: &Server) -> Result<()>;
    fn get_server(&self, id: &str) -> Result<Option<Server>>;
    fn list_servers(&self, cursor: &Cursor) -> Result<Page<Server>>;

    /// Inserts a small fixed set of apps and servers for local testing.
    fn seed_sample_data(&self) -> Result<()>;
}
