//! Database layer for data persistence and access.
//!
//! Data access follows the repository pattern on top of SQLx/SQLite:
//!
//! - [`handlers`]: repository implementations, one per aggregate (users,
//!   garage, armory, humidor), plus analytics queries and the blob store
//! - [`models`]: request/response structures for the repositories
//! - [`errors`]: database-specific error types
//!
//! Repositories wrap an explicit `&mut SqliteConnection` handed in by the
//! caller - there is no ambient session state. Operations that touch several
//! tables (a service log advancing the odometer, a smoking session
//! decrementing stock) open a transaction on that connection so the statement
//! sequence commits atomically.
//!
//! Every repository method that reads or writes an owned entity takes the
//! owning [`crate::types::UserId`] and re-resolves the root row against it.
//! A mismatch is reported as absence, not as a distinct authorization error.
//!
//! Migrations live in `migrations/` and are applied on startup via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
