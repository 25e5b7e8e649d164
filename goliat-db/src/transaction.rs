//! Scoped transactions.

use std::ops::Deref;

use super::connection::Connection;
use super::error::DbResult;

/// Locking behaviour of `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED` (the default). Locks are taken on first access.
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`. Acquires a RESERVED lock immediately.
    Immediate,
    /// `BEGIN EXCLUSIVE`. Acquires an EXCLUSIVE lock immediately.
    Exclusive,
}

impl TransactionBehavior {
    const fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED",
            Self::Immediate => "BEGIN IMMEDIATE",
            Self::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// An open database transaction.
///
/// Rolls back on drop unless [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) was called. Derefs to the [`Connection`], so
/// statements run through it take part in the transaction.
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    finished: bool,
}

impl<'conn> Transaction<'conn> {
    pub(super) fn begin(conn: &'conn Connection, behavior: TransactionBehavior) -> DbResult<Self> {
        conn.execute_batch(behavior.begin_sql())?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// The `COMMIT` failure. The transaction counts as finished either way,
    /// so dropping it afterwards issues no rollback.
    pub fn commit(mut self) -> DbResult<()> {
        self.finish("COMMIT")
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// The `ROLLBACK` failure.
    pub fn rollback(mut self) -> DbResult<()> {
        self.finish("ROLLBACK")
    }

    fn finish(&mut self, sql: &str) -> DbResult<()> {
        self.finished = true;
        self.conn.execute_batch(sql)
    }
}

impl Deref for Transaction<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("rollback on drop failed: {err}");
            }
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
