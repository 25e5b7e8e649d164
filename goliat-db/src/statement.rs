//! Safe wrapper around a `SQLite` prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointers and C type conversions.

use super::column::{FromColumn, Row, Scan};
use super::error::{BindError, DbError, DbResult, EngineError, ErrorCode, Resource};
use super::ffi::{self, RawStmt};
use super::rows::Rows;
use super::value::{BindValue, ToBindValue};

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available.
    Row,
    /// The statement has finished executing.
    Done,
}

/// Execution cursor of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Prepared or freshly reset; parameters may be bound.
    Ready,
    /// A result row is available.
    HasRow,
    /// Execution completed. Stepping again yields [`StepResult::Done`]
    /// until the statement is reset.
    Exhausted,
    /// The last step failed. Stepping again yields the same failure until
    /// the statement is reset.
    Failed,
}

#[derive(Debug)]
enum Cursor {
    Ready,
    HasRow,
    Exhausted,
    Failed(EngineError),
}

/// A prepared `SQLite` statement.
///
/// Created via [`Connection::prepare`](super::Connection::prepare) and tied
/// to the lifetime of that connection. Finalized by [`close`](Self::close)
/// or, failing that, when dropped.
pub struct Statement<'conn> {
    /// `None` once finalized.
    raw: Option<RawStmt<'conn>>,
    cursor: Cursor,
}

impl<'conn> Statement<'conn> {
    /// Wraps a raw statement handle.
    pub(super) const fn new(raw: RawStmt<'conn>) -> Self {
        Self {
            raw: Some(raw),
            cursor: Cursor::Ready,
        }
    }

    fn raw(&self) -> DbResult<&RawStmt<'conn>> {
        self.raw
            .as_ref()
            .ok_or(DbError::ResourceMisuse(Resource::Statement))
    }

    /// Current cursor state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        match self.cursor {
            Cursor::Ready => CursorState::Ready,
            Cursor::HasRow => CursorState::HasRow,
            Cursor::Exhausted => CursorState::Exhausted,
            Cursor::Failed(_) => CursorState::Failed,
        }
    }

    /// Returns `true` once the statement has been finalized.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.raw.is_none()
    }

    /// SQL text the statement was prepared from.
    #[must_use]
    pub fn sql(&self) -> Option<String> {
        self.raw.as_ref().map(RawStmt::sql)
    }

    /// Number of parameters the statement declares. Zero once closed.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.raw
            .as_ref()
            .map_or(0, |raw| usize::try_from(raw.parameter_count()).unwrap_or(0))
    }

    /// Number of result columns. Zero once closed.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.raw
            .as_ref()
            .map_or(0, |raw| usize::try_from(raw.column_count()).unwrap_or(0))
    }

    /// Name of result column `idx`.
    #[must_use]
    pub fn column_name(&self, idx: usize) -> Option<String> {
        if idx >= self.column_count() {
            return None;
        }
        let raw = self.raw.as_ref()?;
        raw.column_name(ffi::to_c_int(idx).ok()?)
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds `values` to the statement parameters, in order (1-indexed).
    ///
    /// # Errors
    ///
    /// [`BindError::ArityMismatch`] unless exactly one value is supplied per
    /// parameter; otherwise the first failing bind.
    pub fn bind(&mut self, values: &[&dyn ToBindValue]) -> DbResult<()> {
        let expected = self.raw().map(|_| self.parameter_count())?;
        if values.len() != expected {
            return Err(BindError::ArityMismatch {
                expected,
                actual: values.len(),
            }
            .into());
        }
        for (i, value) in values.iter().enumerate() {
            self.bind_value(i + 1, *value)?;
        }
        Ok(())
    }

    /// Binds one parameter. `index` is 1-based.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be converted or the engine rejects it
    /// (index out of range, statement running, value too big).
    pub fn bind_value<T: ToBindValue + ?Sized>(&mut self, index: usize, value: &T) -> DbResult<()> {
        let raw = self.raw()?;
        let value = value.to_bind_value()?;
        let idx = ffi::to_c_int(index).map_err(BindError::Engine)?;
        let rc = match &value {
            BindValue::Null => raw.bind_null(idx),
            BindValue::Int(v) => raw.bind_int(idx, *v),
            BindValue::Int64(v) => raw.bind_i64(idx, *v),
            BindValue::Float(v) => raw.bind_double(idx, *v),
            BindValue::Text(v) => raw.bind_text(idx, v),
            BindValue::Blob(v) => raw.bind_blob(idx, v),
            BindValue::ZeroBlob(n) => raw.bind_zeroblob(idx, *n),
        };
        if rc != ffi::SQLITE_OK {
            return Err(BindError::Engine(raw.last_error(rc)).into());
        }
        Ok(())
    }

    /// Sets every parameter back to NULL. Resets the cursor first unless it
    /// is already [`CursorState::Ready`].
    ///
    /// # Errors
    ///
    /// Fails when the statement is closed or the engine call fails.
    pub fn clear_bindings(&mut self) -> DbResult<()> {
        self.reset()?;
        let raw = self.raw()?;
        let rc = raw.clear_bindings();
        if rc != ffi::SQLITE_OK {
            return Err(DbError::Engine(raw.last_error(rc)));
        }
        Ok(())
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Executes a single step.
    ///
    /// # Errors
    ///
    /// [`DbError::Step`] with the connection's code and message when the
    /// engine returns anything but a row or completion. The failure is
    /// latched until [`reset`](Self::reset).
    pub fn step(&mut self) -> DbResult<StepResult> {
        let Some(raw) = self.raw.as_ref() else {
            return Err(DbError::ResourceMisuse(Resource::Statement));
        };
        match &self.cursor {
            Cursor::Exhausted => return Ok(StepResult::Done),
            Cursor::Failed(err) => return Err(DbError::Step(err.clone())),
            Cursor::Ready | Cursor::HasRow => {}
        }
        let rc = raw.step();
        match rc {
            ffi::SQLITE_ROW => {
                self.cursor = Cursor::HasRow;
                Ok(StepResult::Row)
            }
            ffi::SQLITE_DONE => {
                self.cursor = Cursor::Exhausted;
                Ok(StepResult::Done)
            }
            _ => {
                let err = raw.snapshot();
                self.cursor = Cursor::Failed(err.clone());
                Err(DbError::Step(err))
            }
        }
    }

    /// Resets the statement so it can be stepped again. Bindings are kept.
    /// A no-op while the cursor is [`CursorState::Ready`].
    ///
    /// # Errors
    ///
    /// Fails when the statement is closed or the engine call fails.
    pub fn reset(&mut self) -> DbResult<()> {
        let Some(raw) = self.raw.as_ref() else {
            return Err(DbError::ResourceMisuse(Resource::Statement));
        };
        match std::mem::replace(&mut self.cursor, Cursor::Ready) {
            Cursor::Ready => Ok(()),
            Cursor::Failed(_) => {
                // The engine echoes the step failure here; it was already
                // reported by `step`.
                raw.reset();
                Ok(())
            }
            Cursor::HasRow | Cursor::Exhausted => {
                let rc = raw.reset();
                if rc == ffi::SQLITE_OK {
                    Ok(())
                } else {
                    Err(DbError::Engine(raw.last_error(rc)))
                }
            }
        }
    }

    /// Binds `values` once, then steps until completion, discarding any rows.
    ///
    /// # Errors
    ///
    /// The bind failure or the first step failure.
    pub fn execute(&mut self, values: &[&dyn ToBindValue]) -> DbResult<()> {
        self.bind(values)?;
        while self.step()? == StepResult::Row {}
        Ok(())
    }

    /// Wraps the statement in a row iterator.
    #[must_use]
    pub const fn into_rows(self) -> Rows<'conn> {
        Rows::new(self)
    }

    // ── Column reading ──────────────────────────────────────────────────

    /// The current row.
    ///
    /// # Errors
    ///
    /// [`DbError::NoRows`] unless the last step produced a row.
    pub fn row(&self) -> DbResult<Row<'_>> {
        let raw = self.raw()?;
        match self.cursor {
            Cursor::HasRow => Ok(Row::new(raw)),
            _ => Err(DbError::NoRows),
        }
    }

    /// Reads column `idx` of the current row as `T`.
    ///
    /// # Errors
    ///
    /// See [`row`](Self::row) and [`Row::get`].
    pub fn column<T: FromColumn>(&self, idx: usize) -> DbResult<T> {
        self.row()?.get(idx)
    }

    /// Reads the whole current row into a tuple.
    ///
    /// # Errors
    ///
    /// See [`row`](Self::row) and [`Row::scan`].
    pub fn columns<T: Scan>(&self) -> DbResult<T> {
        self.row()?.scan()
    }

    // ── Release ─────────────────────────────────────────────────────────

    /// Finalizes the statement. Calling it again is a no-op.
    ///
    /// A non-OK finalize code only repeats the most recent step failure,
    /// which [`step`](Self::step) already returned, so it is logged rather
    /// than surfaced.
    ///
    /// # Errors
    ///
    /// None at present. Shares the `Result` shape of the other `close`
    /// methods.
    pub fn close(&mut self) -> DbResult<()> {
        if let Some(raw) = self.raw.take() {
            let rc = raw.finalize();
            if rc != ffi::SQLITE_OK {
                log::debug!("finalize returned {}", ErrorCode(rc));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
