//! Per-operation deadlines for the shared SQLite connection.
//!
//! A store call waits for the connection, for SQLite's write lock, and for its
//! own statements to finish, and all three waits are capped by one deadline.

use std::ffi::c_int;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use rusqlite::{Connection, ErrorCode};

use crate::error::{Error, Result};

pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// VM instructions between deadline checks while a statement runs.
const PROGRESS_INTERVAL: c_int = 1_000;
const LOCK_POLL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// A locked connection whose busy wait and running statements are cut off at
/// the deadline. The progress handler is removed again on drop.
pub struct Bounded<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl Deref for Bounded<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for Bounded<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for Bounded<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Locks `conn` and arms it with `deadline`. Fails with [`Error::Timeout`] if
/// the connection stays busy past the deadline.
pub fn bound(conn: &Mutex<Connection>, deadline: Deadline) -> Result<Bounded<'_>> {
    let guard = loop {
        match conn.try_lock() {
            Ok(guard) => break guard,
            Err(TryLockError::Poisoned(e)) => break e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                if deadline.expired() {
                    return Err(Error::Timeout);
                }
                thread::sleep(LOCK_POLL.min(deadline.remaining()));
            }
        }
    };

    guard.busy_timeout(deadline.remaining())?;
    let at = deadline.at;
    guard.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= at));

    Ok(Bounded { conn: guard })
}

/// Maps SQLite's "interrupted" and "busy" failures to [`Error::Timeout`];
/// both only surface here once the deadline has run out.
pub fn classify(err: Error) -> Error {
    match err {
        Error::Database(rusqlite::Error::SqliteFailure(ref e, _))
            if matches!(
                e.code,
                ErrorCode::OperationInterrupted | ErrorCode::DatabaseBusy
            ) =>
        {
            Error::Timeout
        }
        other => other,
    }
}
