//! Database layer for the Campus platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The record store, the shared fan-out log, and
//! the credential store all live in the same SQLite file.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer. Several
//!   server processes may attach to the same file; the shared fan-out log
//!   relies on this.
//! - **`r2d2` connection pool**: bounded connection reuse.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
