//! Connection configuration.
//!
//! [`OpenOptions`] selects the open flags and the per-connection settings
//! applied right after the handle is created:
//!
//! 1. **Open** -- `sqlite3_open_v2` with read-only or read-write(+create)
//!    flags. Full-mutex (serialized) mode is always requested.
//! 2. **Configure** -- busy timeout, `foreign_keys` and `journal_mode`
//!    PRAGMAs, in that order. A failure here closes the handle and is
//!    reported as an open failure.

use std::fmt;
use std::os::raw::c_int;
use std::time::Duration;

use super::ffi;

/// `PRAGMA journal_mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal deleted at the end of each transaction.
    Delete,
    /// Rollback journal truncated instead of deleted.
    Truncate,
    /// Rollback journal header zeroed instead of deleted.
    Persist,
    /// Rollback journal kept in memory.
    Memory,
    /// Write-ahead log.
    Wal,
    /// No rollback journal.
    Off,
}

impl JournalMode {
    /// The PRAGMA keyword for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options used by [`Connection::open_with`](super::Connection::open_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    read_only: bool,
    create: bool,
    busy_timeout: Option<Duration>,
    foreign_keys: bool,
    journal_mode: Option<JournalMode>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    /// Read-write, create if missing, engine defaults for everything else.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_only: false,
            create: true,
            busy_timeout: None,
            foreign_keys: false,
            journal_mode: None,
        }
    }

    /// Opens the database read-only. Implies `create(false)`.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Creates the database file when it does not exist.
    #[must_use]
    pub const fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Retries on `BUSY` for up to `timeout` before failing.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Enforces foreign key constraints.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Switches the journal mode after opening.
    #[must_use]
    pub const fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    /// `SQLITE_OPEN_*` flags for `sqlite3_open_v2`.
    pub(super) const fn flags(&self) -> c_int {
        if self.read_only {
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX
        } else if self.create {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_FULLMUTEX
        } else {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_FULLMUTEX
        }
    }

    /// Busy timeout in milliseconds, saturated to `c_int`.
    pub(super) fn busy_timeout_ms(&self) -> Option<c_int> {
        self.busy_timeout
            .map(|t| c_int::try_from(t.as_millis()).unwrap_or(c_int::MAX))
    }

    /// PRAGMA script applied after open, or `None` when there is nothing to
    /// configure.
    pub(super) fn pragmas(&self) -> Option<String> {
        let mut script = String::new();
        if self.foreign_keys {
            script.push_str("PRAGMA foreign_keys = ON;");
        }
        if let Some(mode) = self.journal_mode {
            script.push_str("PRAGMA journal_mode = ");
            script.push_str(mode.as_str());
            script.push(';');
        }
        (!script.is_empty()).then_some(script)
    }
}
