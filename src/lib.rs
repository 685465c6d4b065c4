//! # Replicator
//!
//! A fleet registry: agents report machine metadata, and operators group the
//! registered servers into apps. Usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use replicator::server::{AppState, create_router};
//! use replicator::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./replicator.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `replicator` binary. Disable with
//!   `default-features = false`.

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod store;
pub mod types;
