//! Persistence layer: libSQL-backed storage for users, sessions and moods.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
