//! Safe, resource-disciplined access to an embedded `SQLite` engine.
//!
//! This crate provides a small, safe Rust API over the `SQLite` C FFI. The
//! engine is compiled from source and linked statically by `libsqlite3-sys`
//! (`bundled` feature), so no system library is needed.
//!
//! Every foreign resource has one owner: [`Connection`], [`Statement`] and
//! [`Blob`]. Each can be released explicitly and idempotently with `close()`
//! and is released when dropped otherwise. Statements, blobs and
//! transactions borrow their connection, so the borrow checker guarantees
//! they are gone before the connection is closed.
//!
//! ```
//! use goliat_db::{params, Connection};
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE kv (k TEXT PRIMARY KEY, v BLOB)")?;
//! conn.exec("INSERT INTO kv VALUES (?1, ?2)", params!["a", vec![1_u8, 2]])?;
//!
//! let v: Vec<u8> = conn.query_row("SELECT v FROM kv WHERE k = ?1", params!["a"], |row| {
//!     row.get(0)
//! })?;
//! assert_eq!(v, [1, 2]);
//! # Ok::<(), goliat_db::DbError>(())
//! ```
//!
//! The `ffi` module is the **only** file that contains `unsafe` code or C
//! types.

mod ffi;

mod blob;
mod column;
mod connection;
pub mod error;
mod options;
mod rows;
mod statement;
mod transaction;
pub mod value;

pub use blob::{Blob, BlobMode, BlobReader, Chunk, DatabaseName};
pub use column::{ColumnType, ColumnValue, FromColumn, Row, Scan};
pub use connection::Connection;
pub use error::{BindError, DbError, DbResult, EngineError, ErrorCode, ExtractError, Resource};
pub use options::{JournalMode, OpenOptions};
pub use rows::{MappedRows, Rows};
pub use statement::{CursorState, Statement, StepResult};
pub use transaction::{Transaction, TransactionBehavior};
pub use value::{BindValue, Null, ToBindValue, Value, ZeroBlob};

#[cfg(test)]
mod tests;
