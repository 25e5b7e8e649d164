//! Column extraction: dynamic type tags, row views and the consume-side
//! conversion traits.
//!
//! Native destination kinds read the accessor matching their kind directly;
//! the engine converts whatever the column holds. Caller-defined kinds
//! implement [`FromColumn`] on top of the checked [`ColumnValue`] accessors,
//! which refuse to convert across dynamic types.

use std::os::raw::c_int;

use super::error::{DbResult, ExtractError};
use super::ffi::{self, RawStmt};
use super::value::Value;

/// Dynamic type of a column's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Text.
    Text,
    /// Blob.
    Blob,
    /// SQL NULL.
    Null,
}

impl ColumnType {
    pub(super) const fn from_raw(raw: c_int) -> Self {
        match raw {
            ffi::SQLITE_INTEGER => Self::Integer,
            ffi::SQLITE_FLOAT => Self::Float,
            ffi::SQLITE_TEXT => Self::Text,
            ffi::SQLITE_BLOB => Self::Blob,
            _ => Self::Null,
        }
    }

    /// Lower-case type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Null => "null",
        }
    }
}

/// Read-only view of one column of the current row.
///
/// Borrows the statement, so it cannot outlive the row it was taken from:
/// advancing the cursor needs `&mut Statement`.
#[derive(Clone, Copy)]
pub struct ColumnValue<'row> {
    raw: &'row RawStmt<'row>,
    index: usize,
    raw_index: c_int,
    kind: ColumnType,
}

impl<'row> ColumnValue<'row> {
    fn new(raw: &'row RawStmt<'row>, index: usize, raw_index: c_int) -> Self {
        Self {
            raw,
            index,
            raw_index,
            kind: ColumnType::from_raw(raw.column_type(raw_index)),
        }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Dynamic type tag captured when the view was created.
    #[must_use]
    pub const fn kind(&self) -> ColumnType {
        self.kind
    }

    /// Returns `true` if the column is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == ColumnType::Null
    }

    /// Returns `true` if the column holds an integer.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.kind == ColumnType::Integer
    }

    /// Returns `true` if the column holds a float.
    #[must_use]
    pub fn is_float(&self) -> bool {
        self.kind == ColumnType::Float
    }

    /// Returns `true` if the column holds text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == ColumnType::Text
    }

    /// Returns `true` if the column holds a blob.
    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.kind == ColumnType::Blob
    }

    /// Reads a float column.
    ///
    /// # Errors
    ///
    /// [`ExtractError::TypeMismatch`] unless the column is a float.
    pub fn as_f64(&self) -> DbResult<f64> {
        self.expect(ColumnType::Float)?;
        Ok(self.raw.column_double(self.raw_index))
    }

    /// Reads an integer column.
    ///
    /// # Errors
    ///
    /// [`ExtractError::TypeMismatch`] unless the column is an integer.
    pub fn as_i64(&self) -> DbResult<i64> {
        self.expect(ColumnType::Integer)?;
        Ok(self.raw.column_i64(self.raw_index))
    }

    /// Reads a text column. NULL reads as an empty string.
    ///
    /// # Errors
    ///
    /// [`ExtractError::TypeMismatch`] unless the column is text or NULL,
    /// [`ExtractError::InvalidUtf8`] when the stored bytes are not UTF-8.
    pub fn as_text(&self) -> DbResult<String> {
        if self.is_null() {
            return Ok(String::new());
        }
        self.expect(ColumnType::Text)?;
        self.coerce_text()
    }

    /// Reads a blob column. NULL reads as an empty `Vec`.
    ///
    /// # Errors
    ///
    /// [`ExtractError::TypeMismatch`] unless the column is a blob or NULL.
    pub fn as_blob(&self) -> DbResult<Vec<u8>> {
        if self.is_null() {
            return Ok(Vec::new());
        }
        self.expect(ColumnType::Blob)?;
        Ok(self.raw.column_blob(self.raw_index))
    }

    fn expect(&self, expected: ColumnType) -> DbResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(ExtractError::TypeMismatch {
                index: self.index,
                expected: expected.as_str(),
                found: self.kind.as_str(),
            }
            .into())
        }
    }

    // Unchecked accessors for the native kinds. The engine converts the
    // stored value to the requested representation.

    fn coerce_int(&self) -> i32 {
        self.raw.column_int(self.raw_index)
    }

    fn coerce_i64(&self) -> i64 {
        self.raw.column_i64(self.raw_index)
    }

    fn coerce_f64(&self) -> f64 {
        self.raw.column_double(self.raw_index)
    }

    fn coerce_text(&self) -> DbResult<String> {
        self.raw
            .column_text(self.raw_index)
            .map_err(|_| ExtractError::InvalidUtf8 { index: self.index }.into())
    }

    fn coerce_blob(&self) -> Vec<u8> {
        self.raw.column_blob(self.raw_index)
    }
}

impl std::fmt::Debug for ColumnValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnValue")
            .field("index", &self.index)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Builds a value from one column of the current row.
///
/// Caller-defined types implement this with the checked accessors:
///
/// ```
/// use goliat_db::{ColumnValue, DbResult, FromColumn};
///
/// struct Celsius(f64);
///
/// impl FromColumn for Celsius {
///     fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
///         value.as_f64().map(Celsius)
///     }
/// }
/// ```
pub trait FromColumn: Sized {
    /// Reads `value` into `Self`.
    ///
    /// # Errors
    ///
    /// Implementations return [`ExtractError`] variants when the column
    /// cannot be represented.
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self>;
}

impl FromColumn for bool {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.coerce_int() != 0)
    }
}

impl FromColumn for i32 {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.coerce_int())
    }
}

impl FromColumn for i64 {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.coerce_i64())
    }
}

impl FromColumn for f64 {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.coerce_f64())
    }
}

impl FromColumn for f32 {
    fn from_column(_value: &ColumnValue<'_>) -> DbResult<Self> {
        Err(ExtractError::UnsupportedType("f32 (use f64 instead)").into())
    }
}

impl FromColumn for String {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        value.coerce_text()
    }
}

impl FromColumn for Vec<u8> {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.coerce_blob())
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_column(value).map(Some)
        }
    }
}

impl FromColumn for Value {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(match value.kind() {
            ColumnType::Null => Self::Null,
            ColumnType::Integer => Self::Integer(value.coerce_i64()),
            ColumnType::Float => Self::Float(value.coerce_f64()),
            ColumnType::Text => Self::Text(value.coerce_text()?),
            ColumnType::Blob => Self::Blob(value.coerce_blob()),
        })
    }
}

impl FromColumn for ColumnType {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        Ok(value.kind())
    }
}

/// A view of the current result row.
///
/// Only handed out while the statement has a row; see
/// [`Statement::row`](super::Statement::row).
#[derive(Clone, Copy)]
pub struct Row<'stmt> {
    raw: &'stmt RawStmt<'stmt>,
    columns: usize,
}

impl<'stmt> Row<'stmt> {
    pub(super) fn new(raw: &'stmt RawStmt<'stmt>) -> Self {
        let columns = usize::try_from(raw.column_count()).unwrap_or(0);
        Self { raw, columns }
    }

    /// Number of result columns.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.columns
    }

    /// Returns the view of column `idx`.
    ///
    /// # Errors
    ///
    /// [`ExtractError::IndexOutOfRange`] when `idx` is past the last column.
    pub fn value(&self, idx: usize) -> DbResult<ColumnValue<'stmt>> {
        if idx >= self.columns {
            return Err(ExtractError::IndexOutOfRange {
                index: idx,
                count: self.columns,
            }
            .into());
        }
        let raw_index = ffi::to_c_int(idx)?;
        Ok(ColumnValue::new(self.raw, idx, raw_index))
    }

    /// Reads column `idx` as `T`.
    ///
    /// # Errors
    ///
    /// Fails when `idx` is out of range or the conversion fails.
    pub fn get<T: FromColumn>(&self, idx: usize) -> DbResult<T> {
        T::from_column(&self.value(idx)?)
    }

    /// Reads every column into a tuple, one element per column.
    ///
    /// # Errors
    ///
    /// [`ExtractError::ArityMismatch`] when the tuple length differs from
    /// [`column_count`](Self::column_count), or the first failing column
    /// conversion.
    pub fn scan<T: Scan>(&self) -> DbResult<T> {
        if T::ARITY != self.columns {
            return Err(ExtractError::ArityMismatch {
                expected: self.columns,
                actual: T::ARITY,
            }
            .into());
        }
        T::scan(self)
    }
}

impl std::fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Destination tuple for a whole row.
pub trait Scan: Sized {
    /// Number of columns the tuple consumes.
    const ARITY: usize;

    /// Reads the row. The arity has already been checked.
    ///
    /// # Errors
    ///
    /// The first failing column conversion.
    fn scan(row: &Row<'_>) -> DbResult<Self>;
}

macro_rules! scan_tuple {
    ($n:expr; $($t:ident => $i:tt),+) => {
        impl<$($t: FromColumn),+> Scan for ($($t,)+) {
            const ARITY: usize = $n;

            fn scan(row: &Row<'_>) -> DbResult<Self> {
                Ok(($(row.get::<$t>($i)?,)+))
            }
        }
    };
}

scan_tuple!(1; A => 0);
scan_tuple!(2; A => 0, B => 1);
scan_tuple!(3; A => 0, B => 1, C => 2);
scan_tuple!(4; A => 0, B => 1, C => 2, D => 3);
scan_tuple!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
scan_tuple!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
scan_tuple!(7; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
scan_tuple!(8; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);
scan_tuple!(9; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7, I => 8);
scan_tuple!(10; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7, I => 8, J => 9);
scan_tuple!(11; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7, I => 8, J => 9, K => 10);
scan_tuple!(12; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7, I => 8, J => 9, K => 10, L => 11);
