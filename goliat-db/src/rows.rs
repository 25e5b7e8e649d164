//! Row iteration over a prepared statement.

use std::marker::PhantomData;

use super::column::{FromColumn, Row, Scan};
use super::error::{DbError, DbResult};
use super::statement::{StepResult, Statement};

/// Forward-only iterator over a statement's result rows.
///
/// Step failures are latched in [`error`](Self::error) instead of being
/// returned from [`advance`](Self::advance). A latched failure and normal
/// completion ([`is_done`](Self::is_done)) are tracked separately.
#[derive(Debug)]
pub struct Rows<'conn> {
    stmt: Statement<'conn>,
    done: bool,
    error: Option<DbError>,
}

impl<'conn> Rows<'conn> {
    pub(super) const fn new(stmt: Statement<'conn>) -> Self {
        Self {
            stmt,
            done: false,
            error: None,
        }
    }

    /// Steps to the next row. Returns `false` once the rows are exhausted or
    /// a step failed.
    pub fn advance(&mut self) -> bool {
        if self.done || self.error.is_some() {
            return false;
        }
        match self.stmt.step() {
            Ok(StepResult::Row) => true,
            Ok(StepResult::Done) => {
                self.done = true;
                false
            }
            Err(err) => {
                self.error = Some(err);
                false
            }
        }
    }

    /// The latched step failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }

    /// Returns `true` once every row has been read without error.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// The current row.
    ///
    /// # Errors
    ///
    /// The latched step failure, or [`DbError::NoRows`] when
    /// [`advance`](Self::advance) has not produced a row.
    pub fn row(&self) -> DbResult<Row<'_>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.stmt.row()
    }

    /// Reads column `idx` of the current row.
    ///
    /// # Errors
    ///
    /// See [`row`](Self::row) and [`Row::get`].
    pub fn get<T: FromColumn>(&self, idx: usize) -> DbResult<T> {
        self.row()?.get(idx)
    }

    /// Reads the whole current row into a tuple.
    ///
    /// # Errors
    ///
    /// See [`row`](Self::row) and [`Row::scan`].
    pub fn scan<T: Scan>(&self) -> DbResult<T> {
        self.row()?.scan()
    }

    /// Finalizes the underlying statement. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// See [`Statement::close`].
    pub fn close(&mut self) -> DbResult<()> {
        self.stmt.close()
    }

    /// Turns the rows into an [`Iterator`] of scanned tuples.
    #[must_use]
    pub const fn mapped<T: Scan>(self) -> MappedRows<'conn, T> {
        MappedRows {
            rows: self,
            finished: false,
            _row: PhantomData,
        }
    }

    pub(super) fn take_error(&mut self) -> Option<DbError> {
        self.error.take()
    }
}

/// Iterator adapter returned by [`Rows::mapped`].
///
/// Yields one `Ok` per row. A step or scan failure is yielded once, after
/// which iteration stops.
#[derive(Debug)]
pub struct MappedRows<'conn, T> {
    rows: Rows<'conn>,
    finished: bool,
    _row: PhantomData<fn() -> T>,
}

impl<T: Scan> Iterator for MappedRows<'_, T> {
    type Item = DbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.rows.advance() {
            self.finished = true;
            return self.rows.take_error().map(Err);
        }
        let item = self.rows.scan();
        self.finished = item.is_err();
        Some(item)
    }
}
