//! Persistence layer: libSQL-backed storage for profiles and the
//! provisioning ledger.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
