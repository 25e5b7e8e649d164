//! Safe wrapper around a `SQLite` database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::path::Path;

use super::blob::{Blob, BlobMode, DatabaseName};
use super::column::{Row, Scan};
use super::error::{DbError, DbResult, EngineError, ErrorCode, Resource};
use super::ffi::{self, RawDb};
use super::options::OpenOptions;
use super::rows::Rows;
use super::statement::Statement;
use super::transaction::{Transaction, TransactionBehavior};
use super::value::ToBindValue;

/// A `SQLite` database connection.
///
/// Statements, blobs and transactions borrow the connection, so it cannot be
/// closed while any of them is alive. Closed when dropped if
/// [`close`](Self::close) was not called. `Send` but not `Sync`.
pub struct Connection {
    /// `None` once closed.
    db: Option<RawDb>,
    path: String,
}

impl Connection {
    /// Opens (or creates) a read-write database at `path`.
    ///
    /// # Errors
    ///
    /// [`DbError::Open`] with the engine's code and message.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with(path, &OpenOptions::new())
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// [`DbError::Open`] when the engine cannot allocate the database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(":memory:")
    }

    /// Opens `path` and applies `options`.
    ///
    /// # Errors
    ///
    /// [`DbError::Open`] when the open or any configuration step fails. The
    /// handle is closed before returning.
    pub fn open_with(path: impl AsRef<Path>, options: &OpenOptions) -> DbResult<Self> {
        let raw_path = path.as_ref();
        let path = raw_path.to_string_lossy().into_owned();
        let db = RawDb::open(raw_path, options.flags()).map_err(DbError::Open)?;
        if let Err(err) = Self::configure(&db, options) {
            log::warn!("configuring {path} failed: {err}");
            return Err(DbError::Open(err));
        }
        log::debug!("opened database {path}");
        Ok(Self { db: Some(db), path })
    }

    fn configure(db: &RawDb, options: &OpenOptions) -> Result<(), EngineError> {
        if let Some(ms) = options.busy_timeout_ms() {
            db.busy_timeout(ms)?;
        }
        if let Some(script) = options.pragmas() {
            db.exec(&script)?;
        }
        Ok(())
    }

    fn raw(&self) -> DbResult<&RawDb> {
        self.db
            .as_ref()
            .ok_or(DbError::ResourceMisuse(Resource::Connection))
    }

    /// Path the connection was opened with, for display. Bytes that are not
    /// valid UTF-8 are shown as U+FFFD; the file itself is opened by its
    /// exact name.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` once [`close`](Self::close) succeeded.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.db.is_none()
    }

    /// Closes the connection. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// The engine's close failure. The connection then stays open and the
    /// call may be retried.
    pub fn close(&mut self) -> DbResult<()> {
        let Some(db) = self.db.take() else {
            return Ok(());
        };
        if let Err((db, err)) = db.close() {
            self.db = Some(db);
            return Err(DbError::Engine(err));
        }
        log::debug!("closed database {}", self.path);
        Ok(())
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    ///
    /// # Errors
    ///
    /// The first failing statement.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        Ok(self.raw()?.exec(sql)?)
    }

    /// Like [`execute_batch`](Self::execute_batch) but zeroizes the internal
    /// C string buffer after execution. Use for SQL containing sensitive
    /// material.
    ///
    /// # Errors
    ///
    /// The first failing statement.
    pub fn execute_batch_zeroized(&self, sql: &str) -> DbResult<()> {
        Ok(self.raw()?.exec_zeroized(sql)?)
    }

    /// Prepares the first SQL statement in `sql`.
    ///
    /// # Errors
    ///
    /// [`DbError::Prepare`] on a syntax error, or with code `MISUSE` when
    /// `sql` holds no statement.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'_>> {
        log::trace!("prepare: {sql}");
        let raw = self.raw()?.prepare(sql).map_err(DbError::Prepare)?;
        raw.map(Statement::new).ok_or_else(|| {
            DbError::Prepare(EngineError::new(ffi::SQLITE_MISUSE, "no SQL statement"))
        })
    }

    /// Prepares, binds and runs one statement to completion.
    ///
    /// # Errors
    ///
    /// The prepare, bind or step failure.
    pub fn exec(&self, sql: &str, params: &[&dyn ToBindValue]) -> DbResult<()> {
        let mut stmt = self.prepare(sql)?;
        stmt.execute(params)
    }

    /// Like [`exec`](Self::exec), returning the number of rows changed.
    ///
    /// # Errors
    ///
    /// The prepare, bind or step failure.
    pub fn execute(&self, sql: &str, params: &[&dyn ToBindValue]) -> DbResult<u64> {
        self.exec(sql, params)?;
        Ok(self.changes())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Prepares and binds a query, returning its row iterator.
    ///
    /// # Errors
    ///
    /// The prepare or bind failure. Step failures are latched in the
    /// returned [`Rows`].
    pub fn query(&self, sql: &str, params: &[&dyn ToBindValue]) -> DbResult<Rows<'_>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        Ok(stmt.into_rows())
    }

    /// Runs a query and maps its first row.
    ///
    /// # Errors
    ///
    /// The step failure if the first step failed, [`DbError::NoRows`] if the
    /// query produced no row, or the mapper's error.
    pub fn query_row<T>(
        &self,
        sql: &str,
        params: &[&dyn ToBindValue],
        mapper: impl FnOnce(&Row<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        let mut rows = self.query(sql, params)?;
        if rows.advance() {
            return mapper(&rows.row()?);
        }
        Err(rows.take_error().unwrap_or(DbError::NoRows))
    }

    /// Like [`query_row`](Self::query_row) but returns `Ok(None)` when no row
    /// is returned.
    ///
    /// # Errors
    ///
    /// The step failure or the mapper's error.
    pub fn query_row_optional<T>(
        &self,
        sql: &str,
        params: &[&dyn ToBindValue],
        mapper: impl FnOnce(&Row<'_>) -> DbResult<T>,
    ) -> DbResult<Option<T>> {
        match self.query_row(sql, params, mapper) {
            Ok(value) => Ok(Some(value)),
            Err(DbError::NoRows) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Runs a query and scans every row into a tuple.
    ///
    /// # Errors
    ///
    /// The first prepare, bind, step or scan failure.
    pub fn query_map<T: Scan>(&self, sql: &str, params: &[&dyn ToBindValue]) -> DbResult<Vec<T>> {
        self.query(sql, params)?.mapped().collect()
    }

    // ── Transactions and blobs ──────────────────────────────────────────

    /// Begins a deferred transaction.
    ///
    /// # Errors
    ///
    /// The `BEGIN` failure, for example when a transaction is already open.
    pub fn transaction(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Deferred)
    }

    /// Begins a transaction with the given locking behavior.
    ///
    /// # Errors
    ///
    /// The `BEGIN` failure.
    pub fn transaction_with(&self, behavior: TransactionBehavior) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, behavior)
    }

    /// Opens incremental I/O on the blob at `(table, column, row_id)`.
    ///
    /// # Errors
    ///
    /// The engine failure, for example when the row does not exist or the
    /// column is indexed.
    pub fn blob_open(
        &self,
        database: DatabaseName,
        table: &str,
        column: &str,
        row_id: i64,
        mode: BlobMode,
    ) -> DbResult<Blob<'_>> {
        let raw = self.raw()?.blob_open(
            database.as_str(),
            table,
            column,
            row_id,
            mode == BlobMode::ReadWrite,
        )?;
        Ok(Blob::new(raw, mode))
    }

    // ── Per-connection state ────────────────────────────────────────────

    /// Code of the most recent failed engine call. `MISUSE` once closed.
    #[must_use]
    pub fn last_error_code(&self) -> ErrorCode {
        self.db
            .as_ref()
            .map_or(ErrorCode::MISUSE, |db| ErrorCode(db.errcode()))
    }

    /// Message of the most recent failed engine call.
    #[must_use]
    pub fn last_error_message(&self) -> String {
        self.db
            .as_ref()
            .map_or_else(|| "connection is closed".to_string(), RawDb::errmsg)
    }

    /// Returns the number of rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.db
            .as_ref()
            .map_or(0, |db| u64::try_from(db.changes()).unwrap_or(0))
    }

    /// Returns the rowid of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.as_ref().map_or(0, RawDb::last_insert_rowid)
    }

    /// Returns `true` outside an explicit transaction.
    #[must_use]
    pub fn is_autocommit(&self) -> bool {
        !matches!(&self.db, Some(db) if !db.is_autocommit())
    }

    /// Runs `PRAGMA integrity_check`.
    ///
    /// Returns `true` when the engine reports `ok`; any other result is
    /// logged and returned as `false`.
    ///
    /// # Errors
    ///
    /// The query failure.
    pub fn integrity_check(&self) -> DbResult<bool> {
        let result: String =
            self.query_row("PRAGMA integrity_check", &[], |row| row.get(0))?;
        if result == "ok" {
            Ok(true)
        } else {
            log::warn!("integrity check failed for {}: {result}", self.path);
            Ok(false)
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
