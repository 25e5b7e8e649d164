//! Error types for the safe `SQLite` wrapper.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result code returned by the engine.
///
/// Kept as an open newtype rather than an enum: extended codes and codes
/// added by newer engine versions pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Successful result.
    pub const OK: Self = Self(0);
    /// Generic error.
    pub const ERROR: Self = Self(1);
    /// Internal logic error in the engine.
    pub const INTERNAL: Self = Self(2);
    /// Access permission denied.
    pub const PERM: Self = Self(3);
    /// Callback routine requested an abort.
    pub const ABORT: Self = Self(4);
    /// The database file is locked.
    pub const BUSY: Self = Self(5);
    /// A table in the database is locked.
    pub const LOCKED: Self = Self(6);
    /// An allocation failed.
    pub const NOMEM: Self = Self(7);
    /// Attempt to write a read-only database.
    pub const READONLY: Self = Self(8);
    /// Operation terminated by an interrupt.
    pub const INTERRUPT: Self = Self(9);
    /// Some kind of disk I/O error occurred.
    pub const IOERR: Self = Self(10);
    /// The database disk image is malformed.
    pub const CORRUPT: Self = Self(11);
    /// Unknown opcode or table not found.
    pub const NOTFOUND: Self = Self(12);
    /// Insertion failed because the database is full.
    pub const FULL: Self = Self(13);
    /// Unable to open the database file.
    pub const CANTOPEN: Self = Self(14);
    /// Database lock protocol error.
    pub const PROTOCOL: Self = Self(15);
    /// Internal use only.
    pub const EMPTY: Self = Self(16);
    /// The database schema changed.
    pub const SCHEMA: Self = Self(17);
    /// String or blob exceeds the size limit.
    pub const TOOBIG: Self = Self(18);
    /// Abort due to constraint violation.
    pub const CONSTRAINT: Self = Self(19);
    /// Data type mismatch.
    pub const MISMATCH: Self = Self(20);
    /// Library used incorrectly.
    pub const MISUSE: Self = Self(21);
    /// Uses OS features not supported on host.
    pub const NOLFS: Self = Self(22);
    /// Authorization denied.
    pub const AUTH: Self = Self(23);
    /// Not used.
    pub const FORMAT: Self = Self(24);
    /// Bind parameter or column index out of range.
    pub const RANGE: Self = Self(25);
    /// File opened that is not a database file.
    pub const NOTADB: Self = Self(26);
    /// Notifications from the logging interface.
    pub const NOTICE: Self = Self(27);
    /// Warnings from the logging interface.
    pub const WARNING: Self = Self(28);
    /// A step produced a result row.
    pub const ROW: Self = Self(100);
    /// A step finished executing.
    pub const DONE: Self = Self(101);

    /// Strips the extended bits, leaving the primary result code.
    #[must_use]
    pub const fn primary(self) -> Self {
        Self(self.0 & 0xff)
    }

    /// Symbolic name of the primary code, or `None` for unknown codes.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        let name = match self.primary().0 {
            0 => "OK",
            1 => "ERROR",
            2 => "INTERNAL",
            3 => "PERM",
            4 => "ABORT",
            5 => "BUSY",
            6 => "LOCKED",
            7 => "NOMEM",
            8 => "READONLY",
            9 => "INTERRUPT",
            10 => "IOERR",
            11 => "CORRUPT",
            12 => "NOTFOUND",
            13 => "FULL",
            14 => "CANTOPEN",
            15 => "PROTOCOL",
            16 => "EMPTY",
            17 => "SCHEMA",
            18 => "TOOBIG",
            19 => "CONSTRAINT",
            20 => "MISMATCH",
            21 => "MISUSE",
            22 => "NOLFS",
            23 => "AUTH",
            24 => "FORMAT",
            25 => "RANGE",
            26 => "NOTADB",
            27 => "NOTICE",
            28 => "WARNING",
            100 => "ROW",
            101 => "DONE",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Code and message snapshot taken right after a failing engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sqlite error {code}: {message}")]
pub struct EngineError {
    /// Engine result code.
    pub code: ErrorCode,
    /// Human-readable error message (from `sqlite3_errmsg` when available).
    pub message: String,
}

impl EngineError {
    /// Creates a new engine error.
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode(code),
            message: message.into(),
        }
    }
}

/// Handle kinds, used to report operations on released handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A database connection.
    Connection,
    /// A prepared statement.
    Statement,
    /// An incremental blob handle.
    Blob,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::Statement => "statement",
            Self::Blob => "blob",
        })
    }
}

/// Parameter binding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The number of supplied values differs from the parameter count.
    #[error("wrong number of values {actual} != {expected}")]
    ArityMismatch {
        /// Parameters declared by the statement.
        expected: usize,
        /// Values supplied by the caller.
        actual: usize,
    },
    /// The value kind cannot be bound.
    #[error("unsupported type {0}")]
    UnsupportedType(&'static str),
    /// The engine rejected the bind call.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Column extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The number of destinations differs from the result column count.
    #[error("wrong number of values {actual} != {expected}")]
    ArityMismatch {
        /// Columns produced by the statement.
        expected: usize,
        /// Destinations supplied by the caller.
        actual: usize,
    },
    /// The column's dynamic type is not the one the accessor reads.
    #[error("column {index}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Zero-based column index.
        index: usize,
        /// Type the accessor requires.
        expected: &'static str,
        /// Type the column currently holds.
        found: &'static str,
    },
    /// The column index is past the last result column.
    #[error("column index {index} out of range for {count} columns")]
    IndexOutOfRange {
        /// Requested zero-based column index.
        index: usize,
        /// Columns produced by the statement.
        count: usize,
    },
    /// A text column holds bytes that are not valid UTF-8.
    #[error("column {index}: text is not valid UTF-8")]
    InvalidUtf8 {
        /// Zero-based column index.
        index: usize,
    },
    /// The destination kind cannot be extracted.
    #[error("unsupported type {0}")]
    UnsupportedType(&'static str),
}

/// Error returned by database operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The database could not be opened or configured.
    #[error("failed to open database: {0}")]
    Open(EngineError),
    /// The SQL text could not be compiled.
    #[error("failed to prepare statement: {0}")]
    Prepare(EngineError),
    /// Parameters could not be bound.
    #[error("failed to bind parameters: {0}")]
    Bind(#[from] BindError),
    /// A step returned something other than a row or completion.
    #[error("failed to step statement: {0}")]
    Step(EngineError),
    /// Column values could not be read.
    #[error("failed to read columns: {0}")]
    Extract(#[from] ExtractError),
    /// A query expected to produce a row produced none.
    #[error("query returned no rows")]
    NoRows,
    /// A blob read or seek fell outside `0..=size`.
    #[error("offset {offset} + length {len} exceeds blob size {size}")]
    BlobRange {
        /// Requested absolute offset.
        offset: i128,
        /// Requested length.
        len: usize,
        /// Fixed size of the blob.
        size: usize,
    },
    /// The handle was already released.
    #[error("{0} used after release")]
    ResourceMisuse(Resource),
    /// Any other failing engine call (reset, close, exec, blob I/O).
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DbError {
    /// Returns `true` for the distinguished "no rows" condition.
    #[must_use]
    pub const fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Engine result code carried by the error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Open(e) | Self::Prepare(e) | Self::Step(e) | Self::Engine(e) => {
                Some(e.code)
            }
            Self::Bind(BindError::Engine(e)) => Some(e.code),
            _ => None,
        }
    }

    /// Recovers a `DbError` carried inside an [`io::Error`] produced by the
    /// blob stream adapter.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Option<&Self> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Self>())
    }
}

impl From<DbError> for io::Error {
    fn from(err: DbError) -> Self {
        let kind = match err {
            DbError::BlobRange { .. } => io::ErrorKind::InvalidInput,
            DbError::ResourceMisuse(_) => io::ErrorKind::NotConnected,
            _ => io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
