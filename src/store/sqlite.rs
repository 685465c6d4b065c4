use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params, params_from_iter,
};
use uuid::Uuid;

use super::deadline::{self, Deadline, OPERATION_TIMEOUT};
use super::page::paginate;
use super::reconcile::{diff, intersect, unique};
use super::schema::SCHEMA;
use super::slug::slugify;
use super::{MEMBERSHIP_BATCH_SIZE, Store};
use crate::error::{Error, Result};
use crate::types::*;

const APP_COLUMNS: &str = "id, name, identifier, description, created_at, updated_at";
const SERVER_COLUMNS: &str = "id, hostname, os, arch, num_cpu, kernel, uptime, total_memory_mb, \
     total_disk_size_gb, mounted_count, timestamp_utc, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    timeout: Duration,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
            timeout: OPERATION_TIMEOUT,
        })
    }

    /// Overrides the per-operation deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Locks the raw connection. Unlike the `Store` methods this waits
    /// without a deadline.
    pub(crate) fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `f` against the connection under this store's deadline.
    fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let result = deadline::bound(&self.conn, Deadline::after(self.timeout))
            .and_then(|mut conn| f(&mut *conn))
            .map_err(deadline::classify);

        if let Err(Error::Timeout) = result {
            tracing::warn!("{op} exceeded {}ms deadline", self.timeout.as_millis());
        }
        result
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn app_from_row(row: &Row<'_>) -> rusqlite::Result<App> {
    Ok(App {
        id: row.get(0)?,
        name: row.get(1)?,
        identifier: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<Server> {
    Ok(Server {
        id: row.get(0)?,
        hostname: row.get(1)?,
        os: row.get(2)?,
        arch: row.get(3)?,
        num_cpu: row.get(4)?,
        kernel: row.get(5)?,
        uptime: row.get(6)?,
        total_memory_mb: row.get(7)?,
        total_disk_size_gb: row.get(8)?,
        mounted_count: row.get(9)?,
        timestamp_utc: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Maps a unique-constraint failure on `apps` to a conflict naming the field.
fn app_conflict(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(ref msg))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            // "apps.id" is a prefix of "apps.identifier"
            let field = if msg.contains("apps.identifier") {
                "identifier"
            } else if msg.contains("apps.name") {
                "name"
            } else if msg.contains("apps.id") {
                "id"
            } else {
                "app"
            };
            Error::Conflict(field.to_string())
        }
        other => Error::from(other),
    }
}

fn select_app(conn: &Connection, selector: &AppSelector) -> Result<App> {
    selector.validate()?;
    conn.query_row(
        &format!(
            "SELECT {APP_COLUMNS} FROM apps WHERE {} = ?1",
            selector.column()
        ),
        params![selector.value()],
        app_from_row,
    )
    .optional()?
    .ok_or(Error::NotFound)
}

/// Pre-checks name and identifier, then inserts. The unique constraints still
/// catch writers that race past the pre-check.
fn insert_app(conn: &Connection, app: &App) -> Result<()> {
    for (column, value) in [("name", &app.name), ("identifier", &app.identifier)] {
        let taken = conn
            .query_row(
                &format!("SELECT 1 FROM apps WHERE {column} = ?1"),
                params![value],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Err(Error::Conflict(column.to_string()));
        }
    }

    conn.execute(
        &format!("INSERT INTO apps ({APP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            app.id,
            app.name,
            app.identifier,
            app.description,
            format_datetime(&app.created_at),
            format_datetime(&app.updated_at),
        ],
    )
    .map_err(app_conflict)?;
    Ok(())
}

fn insert_server(conn: &Connection, server: &Server) -> Result<()> {
    let result = conn.execute(
        &format!(
            "INSERT INTO metadata ({SERVER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            server.id,
            server.hostname,
            server.os,
            server.arch,
            server.num_cpu,
            server.kernel,
            server.uptime,
            server.total_memory_mb,
            server.total_disk_size_gb,
            server.mounted_count,
            server.timestamp_utc,
            format_datetime(&server.created_at),
            format_datetime(&server.updated_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(Error::Conflict("server".to_string()))
        }
        Err(e) => Err(Error::from(e)),
    }
}

/// Which of `ids` exist as server rows, in the order of `ids`.
fn existing_server_ids(conn: &Connection, ids: &[String]) -> Result<Vec<String>> {
    let mut found = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MEMBERSHIP_BATCH_SIZE) {
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM metadata WHERE id IN ({})",
            placeholders(chunk.len())
        ))?;
        let rows = stmt.query_map(params_from_iter(chunk), |row| row.get::<_, String>(0))?;
        for id in rows {
            found.push(id?);
        }
    }
    Ok(intersect(ids, &found))
}

fn linked_server_ids(conn: &Connection, app_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT metadata_id FROM app_servers WHERE app_id = ?1 ORDER BY metadata_id",
    )?;
    let rows = stmt.query_map(params![app_id], |row| row.get::<_, String>(0))?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Links `server_ids` to the app, one multi-row statement per batch. Pairs
/// that already exist are left alone.
fn insert_links(conn: &Connection, app_id: &str, server_ids: &[String]) -> Result<usize> {
    let now = format_datetime(&Utc::now());
    let mut inserted = 0;
    for chunk in server_ids.chunks(MEMBERSHIP_BATCH_SIZE) {
        let values = vec!["(?, ?, ?)"; chunk.len()].join(", ");
        let args = chunk
            .iter()
            .flat_map(|sid| [app_id, sid.as_str(), now.as_str()]);
        inserted += conn.execute(
            &format!(
                "INSERT OR IGNORE INTO app_servers (app_id, metadata_id, created_at) VALUES {values}"
            ),
            params_from_iter(args),
        )?;
    }
    Ok(inserted)
}

fn delete_links(conn: &Connection, app_id: &str, server_ids: &[String]) -> Result<usize> {
    let mut deleted = 0;
    for chunk in server_ids.chunks(MEMBERSHIP_BATCH_SIZE) {
        let args = std::iter::once(app_id).chain(chunk.iter().map(String::as_str));
        deleted += conn.execute(
            &format!(
                "DELETE FROM app_servers WHERE app_id = ? AND metadata_id IN ({})",
                placeholders(chunk.len())
            ),
            params_from_iter(args),
        )?;
    }
    Ok(deleted)
}

fn replace_links(conn: &Connection, app_id: &str, desired: &[String]) -> Result<(usize, usize)> {
    let current = linked_server_ids(conn, app_id)?;
    let existing = if desired.is_empty() {
        Vec::new()
    } else {
        existing_server_ids(conn, desired)?
    };

    let to_add = intersect(&diff(desired, &current), &existing);
    let to_delete = diff(&current, desired);

    let removed = delete_links(conn, app_id, &to_delete)?;
    let added = insert_links(conn, app_id, &to_add)?;
    Ok((added, removed))
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.run("initialize", |conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
    }

    // App operations

    fn create_app(&self, new: NewApp) -> Result<App> {
        if new.id.is_empty() {
            return Err(Error::Validation("id is required".to_string()));
        }
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        let identifier = slugify(&new.identifier);
        if identifier.is_empty() {
            return Err(Error::Validation("identifier is required".to_string()));
        }

        let now = Utc::now();
        let app = App {
            id: new.id,
            name,
            identifier,
            description: new.description,
            created_at: now,
            updated_at: now,
        };

        self.run("create_app", |conn| insert_app(conn, &app))?;
        Ok(app)
    }

    fn find_app(&self, selector: &AppSelector) -> Result<App> {
        self.run("find_app", |conn| select_app(conn, selector))
    }

    fn list_apps(&self, after_id: &str, limit: i64) -> Result<Page<App>> {
        let limit = clamp_limit(limit);
        let rows = self.run("list_apps", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APP_COLUMNS} FROM apps WHERE id > ?1 ORDER BY id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![after_id, limit + 1], app_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })?;

        Ok(paginate(rows, limit, |app| app.id.clone()))
    }

    fn delete_app(&self, selector: &AppSelector) -> Result<()> {
        selector.validate()?;
        let column = selector.column();

        self.run("delete_app", |conn| {
            let tx = conn.transaction()?;

            let links = tx.execute(
                &format!(
                    "DELETE FROM app_servers WHERE app_id IN (SELECT id FROM apps WHERE {column} = ?1)"
                ),
                params![selector.value()],
            )?;
            let rows = tx.execute(
                &format!("DELETE FROM apps WHERE {column} = ?1"),
                params![selector.value()],
            )?;

            // Dropping the uncommitted transaction rolls it back.
            if rows == 0 {
                return Err(Error::NotFound);
            }

            tx.commit()?;
            tracing::debug!(%selector, links, "deleted app");
            Ok(())
        })
    }

    // App-Server M2M operations

    fn modify_app_servers(
        &self,
        selector: &AppSelector,
        server_ids: &[String],
        op: MembershipOp,
    ) -> Result<()> {
        let ids = unique(server_ids);

        self.run("modify_app_servers", |conn| {
            // IMMEDIATE takes the write lock up front, so Replace reads and
            // writes against one snapshot.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let app = select_app(&tx, selector)?;

            let (added, removed) = match op {
                MembershipOp::Add => {
                    let existing = if ids.is_empty() {
                        Vec::new()
                    } else {
                        existing_server_ids(&tx, &ids)?
                    };
                    (insert_links(&tx, &app.id, &existing)?, 0)
                }
                MembershipOp::Remove => (0, delete_links(&tx, &app.id, &ids)?),
                MembershipOp::Replace => replace_links(&tx, &app.id, &ids)?,
            };

            tx.commit()?;
            tracing::debug!(
                app_id = %app.id,
                %op,
                requested = ids.len(),
                added,
                removed,
                "modified app membership"
            );
            Ok(())
        })
    }

    fn list_app_servers(
        &self,
        selector: &AppSelector,
        cursor: &Cursor,
    ) -> Result<AppServersPage> {
        let limit = cursor.effective_limit();

        let (total, rows) = self.run("list_app_servers", |conn| {
            // One read transaction so the count and the page agree.
            let tx = conn.transaction()?;
            let app = select_app(&tx, selector)?;

            let total: i64 = tx.query_row(
                "SELECT COUNT(*) FROM app_servers WHERE app_id = ?1",
                params![app.id],
                |row| row.get(0),
            )?;

            let rows = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SERVER_COLUMNS} FROM metadata
                     WHERE id IN (SELECT metadata_id FROM app_servers WHERE app_id = ?1)
                       AND id > ?2
                     ORDER BY id LIMIT ?3"
                ))?;
                let rows =
                    stmt.query_map(params![app.id, cursor.after_id, limit + 1], server_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            tx.commit()?;
            Ok((total, rows))
        })?;

        let page = paginate(rows, limit, |server| server.id.clone());
        Ok(AppServersPage {
            total,
            next_cursor: page.next_cursor,
            items: page.items,
        })
    }

    // Server operations

    fn create_server(&self, server: &Server) -> Result<()> {
        if server.id.is_empty() {
            return Err(Error::Validation("id is required".to_string()));
        }
        self.run("create_server", |conn| insert_server(conn, server))
    }

    fn get_server(&self, id: &str) -> Result<Option<Server>> {
        self.run("get_server", |conn| {
            conn.query_row(
                &format!("SELECT {SERVER_COLUMNS} FROM metadata WHERE id = ?1"),
                params![id],
                server_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn list_servers(&self, cursor: &Cursor) -> Result<Page<Server>> {
        let limit = cursor.effective_limit();
        let rows = self.run("list_servers", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERVER_COLUMNS} FROM metadata WHERE id > ?1 ORDER BY id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![cursor.after_id, limit + 1], server_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })?;

        Ok(paginate(rows, limit, |server| server.id.clone()))
    }

    fn seed_sample_data(&self) -> Result<()> {
        let now = Utc::now();
        let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let sample_server = |hostname: &str, num_cpu, memory_mb, disk_gb: &str, mounts| Server {
            id: Uuid::new_v4().to_string(),
            hostname: hostname.to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            num_cpu,
            kernel: "5.15.0".to_string(),
            uptime: "12h".to_string(),
            total_memory_mb: memory_mb,
            total_disk_size_gb: disk_gb.to_string(),
            mounted_count: mounts,
            timestamp_utc: timestamp.clone(),
            created_at: now,
            updated_at: now,
        };
        let servers = [
            sample_server("srv-payments-01", 4, 8192, "100", 3),
            sample_server("srv-analytics-01", 8, 16384, "200", 4),
        ];

        let sample_app = |name: &str, description: &str| App {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            identifier: slugify(name),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        let apps = [
            sample_app("Payments", "Prod payment service"),
            sample_app("Analytics", "Analytics and BI service"),
        ];

        self.run("seed_sample_data", |conn| {
            let tx = conn.transaction()?;
            for server in &servers {
                insert_server(&tx, server)?;
            }
            for app in &apps {
                insert_app(&tx, app)?;
            }
            insert_links(&tx, &apps[0].id, std::slice::from_ref(&servers[0].id))?;
            tx.commit()?;
            Ok(())
        })?;

        tracing::info!(
            apps = apps.len(),
            servers = servers.len(),
            "inserted sample data"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn new_app(id: &str, name: &str, identifier: &str) -> NewApp {
        NewApp {
            id: id.to_string(),
            name: name.to_string(),
            identifier: identifier.to_string(),
            description: String::new(),
        }
    }

    fn server(id: &str) -> Server {
        Server {
            id: id.to_string(),
            hostname: format!("{id}.example.internal"),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            num_cpu: 4,
            kernel: "6.1.0".to_string(),
            uptime: "1h".to_string(),
            total_memory_mb: 8192,
            total_disk_size_gb: "100".to_string(),
            mounted_count: 2,
            timestamp_utc: "2026-01-01T00:00:00Z".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn members(store: &SqliteStore, selector: &AppSelector) -> Vec<String> {
        store
            .list_app_servers(selector, &Cursor::new("", 500))
            .unwrap()
            .items
            .into_iter()
            .map(|s| s.id)
            .collect()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open_store();

        let conn = store.connection();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"apps".to_string()));
        assert!(tables.contains(&"metadata".to_string()));
        assert!(tables.contains(&"app_servers".to_string()));
    }

    #[test]
    fn test_app_crud() {
        let (_temp, store) = open_store();

        let app = store
            .create_app(NewApp {
                description: "Prod payment service".to_string(),
                ..new_app("app-1", "  Payments ", "Payments Core")
            })
            .unwrap();
        assert_eq!(app.name, "Payments");
        assert_eq!(app.identifier, "payments-core");

        let by_id = store.find_app(&AppSelector::Id("app-1".to_string())).unwrap();
        assert_eq!(by_id, app);

        let by_identifier = store
            .find_app(&AppSelector::Identifier("payments-core".to_string()))
            .unwrap();
        assert_eq!(by_identifier.id, "app-1");
        assert_eq!(by_identifier.description, "Prod payment service");

        store
            .delete_app(&AppSelector::Identifier("payments-core".to_string()))
            .unwrap();
        assert!(matches!(
            store.find_app(&AppSelector::Id("app-1".to_string())),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_create_app_validation() {
        let (_temp, store) = open_store();

        assert!(matches!(
            store.create_app(new_app("app-1", "   ", "ok")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.create_app(new_app("app-1", "Name", "!!!")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.create_app(new_app("", "Name", "name")),
            Err(Error::Validation(_))
        ));
        assert!(store.list_apps("", 10).unwrap().items.is_empty());
    }

    #[test]
    fn test_create_app_conflicts() {
        let (_temp, store) = open_store();
        let first = store
            .create_app(new_app("app-1", "Payments", "payments"))
            .unwrap();

        let err = store
            .create_app(new_app("app-2", "Payments", "other"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref f) if f == "name"));

        let err = store
            .create_app(new_app("app-3", "Other", "PAYMENTS"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref f) if f == "identifier"));

        let err = store
            .create_app(new_app("app-1", "Third", "third"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref f) if f == "id"));

        let still = store.find_app(&AppSelector::Id("app-1".to_string())).unwrap();
        assert_eq!(still, first);
        assert_eq!(store.list_apps("", 10).unwrap().items.len(), 1);
    }

    #[test]
    fn test_unique_constraint_maps_to_conflict() {
        let err = app_conflict(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: apps.identifier".to_string()),
        ));
        assert!(matches!(err, Error::Conflict(ref f) if f == "identifier"));
    }

    #[test]
    fn test_find_app_rejects_empty_selector() {
        let (_temp, store) = open_store();
        assert!(matches!(
            store.find_app(&AppSelector::Id(String::new())),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.find_app(&AppSelector::Identifier("nope".to_string())),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_list_apps_two_pages() {
        let (_temp, store) = open_store();
        store.create_app(new_app("B", "Beta", "beta")).unwrap();
        store.create_app(new_app("A", "Alpha", "alpha")).unwrap();

        let first = store.list_apps("", 1).unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].id, "A");
        assert_eq!(first.next_cursor, "A");

        let second = store.list_apps("A", 1).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "B");
        assert_eq!(second.next_cursor, "");
    }

    #[test]
    fn test_list_apps_pagination_terminates() {
        let (_temp, store) = open_store();
        for i in 0..23 {
            store
                .create_app(new_app(&format!("app-{i:02}"), &format!("App {i}"), &format!("app-{i}")))
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = String::new();
        let mut pages = 0;
        loop {
            let page = store.list_apps(&cursor, 5).unwrap();
            pages += 1;
            seen.extend(page.items.into_iter().map(|a| a.id));
            if page.next_cursor.is_empty() {
                break;
            }
            cursor = page.next_cursor;
        }

        let expected: Vec<String> = (0..23).map(|i| format!("app-{i:02}")).collect();
        assert_eq!(seen, expected);
        assert_eq!(pages, 5);
    }

    #[test]
    fn test_list_apps_clamps_limit() {
        let (_temp, store) = open_store();
        for i in 0..60 {
            store
                .create_app(new_app(&format!("app-{i:02}"), &format!("App {i}"), &format!("app-{i}")))
                .unwrap();
        }

        let page = store.list_apps("", 0).unwrap();
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.next_cursor, "app-49");

        let page = store.list_apps("", 9999).unwrap();
        assert_eq!(page.items.len(), 50);
    }

    #[test]
    fn test_membership_scenario() {
        let (_temp, store) = open_store();
        store.create_server(&server("srv-a")).unwrap();
        store.create_server(&server("srv-b")).unwrap();
        let app = store
            .create_app(new_app("app-1", "Payments", "payments"))
            .unwrap();
        let sel = AppSelector::Id(app.id.clone());

        store
            .modify_app_servers(&sel, &ids(&["srv-a", "srv-b", "unknown-id"]), MembershipOp::Add)
            .unwrap();
        assert_eq!(members(&store, &sel), ids(&["srv-a", "srv-b"]));

        store
            .modify_app_servers(&sel, &ids(&["srv-a"]), MembershipOp::Replace)
            .unwrap();
        assert_eq!(members(&store, &sel), ids(&["srv-a"]));

        store
            .modify_app_servers(&sel, &ids(&["srv-a"]), MembershipOp::Remove)
            .unwrap();
        assert!(members(&store, &sel).is_empty());
    }

    #[test]
    fn test_add_is_union_and_idempotent() {
        let (_temp, store) = open_store();
        for id in ["s1", "s2", "s3", "s4"] {
            store.create_server(&server(id)).unwrap();
        }
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Identifier("web".to_string());

        store
            .modify_app_servers(&sel, &ids(&["s1", "s2"]), MembershipOp::Add)
            .unwrap();
        store
            .modify_app_servers(&sel, &ids(&["s2", "s3", "", "s3", "ghost"]), MembershipOp::Add)
            .unwrap();
        assert_eq!(members(&store, &sel), ids(&["s1", "s2", "s3"]));

        store
            .modify_app_servers(&sel, &ids(&["s2", "s3", "", "s3", "ghost"]), MembershipOp::Add)
            .unwrap();
        assert_eq!(members(&store, &sel), ids(&["s1", "s2", "s3"]));
    }

    #[test]
    fn test_add_more_than_one_batch() {
        let (_temp, store) = open_store();
        let count = MEMBERSHIP_BATCH_SIZE + 37;
        let server_ids: Vec<String> = (0..count).map(|i| format!("srv-{i:04}")).collect();
        for id in &server_ids {
            store.create_server(&server(id)).unwrap();
        }
        store.create_app(new_app("app-1", "Big", "big")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());

        store
            .modify_app_servers(&sel, &server_ids, MembershipOp::Add)
            .unwrap();
        let page = store.list_app_servers(&sel, &Cursor::new("", 10)).unwrap();
        assert_eq!(page.total, count as i64);

        store
            .modify_app_servers(&sel, &server_ids, MembershipOp::Remove)
            .unwrap();
        let page = store.list_app_servers(&sel, &Cursor::default()).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_remove_non_member_is_noop() {
        let (_temp, store) = open_store();
        store.create_server(&server("s1")).unwrap();
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());

        store
            .modify_app_servers(&sel, &ids(&["s1"]), MembershipOp::Add)
            .unwrap();
        store
            .modify_app_servers(&sel, &ids(&["s2", "nobody"]), MembershipOp::Remove)
            .unwrap();
        store
            .modify_app_servers(&sel, &[], MembershipOp::Remove)
            .unwrap();
        assert_eq!(members(&store, &sel), ids(&["s1"]));
    }

    #[test]
    fn test_replace_is_idempotent() {
        let (_temp, store) = open_store();
        for id in ["s1", "s2", "s3"] {
            store.create_server(&server(id)).unwrap();
        }
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());

        store
            .modify_app_servers(&sel, &ids(&["s1", "s2"]), MembershipOp::Add)
            .unwrap();

        let desired = ids(&["s3", "s2", "ghost", "s3"]);
        store
            .modify_app_servers(&sel, &desired, MembershipOp::Replace)
            .unwrap();
        let once = members(&store, &sel);
        store
            .modify_app_servers(&sel, &desired, MembershipOp::Replace)
            .unwrap();
        assert_eq!(members(&store, &sel), once);
        assert_eq!(once, ids(&["s2", "s3"]));

        store
            .modify_app_servers(&sel, &[], MembershipOp::Replace)
            .unwrap();
        assert!(members(&store, &sel).is_empty());
    }

    #[test]
    fn test_replace_rolls_back_on_failure() {
        let (_temp, store) = open_store();
        for id in ["s1", "s2", "s3"] {
            store.create_server(&server(id)).unwrap();
        }
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());
        store
            .modify_app_servers(&sel, &ids(&["s1", "s2"]), MembershipOp::Add)
            .unwrap();

        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_s3 BEFORE INSERT ON app_servers
                 WHEN NEW.metadata_id = 's3'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        // The delete of s2 runs before the failing insert of s3.
        let result = store.modify_app_servers(&sel, &ids(&["s1", "s3"]), MembershipOp::Replace);
        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(members(&store, &sel), ids(&["s1", "s2"]));
    }

    #[test]
    fn test_modify_unknown_app() {
        let (_temp, store) = open_store();
        let result = store.modify_app_servers(
            &AppSelector::Identifier("missing".to_string()),
            &ids(&["s1"]),
            MembershipOp::Add,
        );
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(matches!(
            store.list_app_servers(&AppSelector::Id("missing".to_string()), &Cursor::default()),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_list_app_servers_pages_with_total() {
        let (_temp, store) = open_store();
        for id in ["s1", "s2", "s3", "s4", "s5"] {
            store.create_server(&server(id)).unwrap();
        }
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());
        store
            .modify_app_servers(&sel, &ids(&["s4", "s2", "s5"]), MembershipOp::Add)
            .unwrap();

        let first = store.list_app_servers(&sel, &Cursor::new("", 2)).unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(
            first.items.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            ["s2", "s4"]
        );
        assert_eq!(first.next_cursor, "s4");

        let second = store
            .list_app_servers(&sel, &Cursor::new(first.next_cursor, 2))
            .unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "s5");
        assert_eq!(second.next_cursor, "");
    }

    #[test]
    fn test_delete_app_cascades_links_only() {
        let (_temp, store) = open_store();
        store.create_server(&server("s1")).unwrap();
        store.create_app(new_app("app-1", "Web", "web")).unwrap();
        let sel = AppSelector::Id("app-1".to_string());
        store
            .modify_app_servers(&sel, &ids(&["s1"]), MembershipOp::Add)
            .unwrap();

        store.delete_app(&sel).unwrap();

        let links: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM app_servers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 0);
        assert!(store.get_server("s1").unwrap().is_some());

        assert!(matches!(store.delete_app(&sel), Err(Error::NotFound)));
    }

    #[test]
    fn test_server_roundtrip_and_listing() {
        let (_temp, store) = open_store();
        let s = server("s1");
        store.create_server(&s).unwrap();
        store.create_server(&server("s2")).unwrap();

        let fetched = store.get_server("s1").unwrap().unwrap();
        assert_eq!(fetched.hostname, s.hostname);
        assert_eq!(fetched.total_memory_mb, 8192);
        assert!(store.get_server("s9").unwrap().is_none());

        assert!(matches!(
            store.create_server(&server("s1")),
            Err(Error::Conflict(_))
        ));

        let page = store.list_servers(&Cursor::new("s1", 10)).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "s2");
    }

    #[test]
    fn test_operation_times_out_while_connection_held() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db"))
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        store.initialize().unwrap();

        let _held = store.connection();
        std::thread::scope(|s| {
            let result = s.spawn(|| store.list_apps("", 10).map(|_| ()));
            assert!(matches!(result.join().unwrap(), Err(Error::Timeout)));
        });
    }

    #[test]
    fn test_seed_sample_data() {
        let (_temp, store) = open_store();
        store.seed_sample_data().unwrap();

        let payments = store
            .find_app(&AppSelector::Identifier("payments".to_string()))
            .unwrap();
        let page = store
            .list_app_servers(&AppSelector::Id(payments.id), &Cursor::default())
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].hostname, "srv-payments-01");

        assert!(matches!(store.seed_sample_data(), Err(Error::Conflict(_))));
        assert_eq!(store.list_apps("", 10).unwrap().items.len(), 2);
        assert_eq!(store.list_servers(&Cursor::default()).unwrap().items.len(), 2);
    }
}
