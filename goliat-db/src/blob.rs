//! Incremental blob I/O.
//!
//! [`Blob`] addresses one blob cell by `(database, table, column, rowid)` and
//! reads or writes byte ranges of it without loading the whole value.
//! [`BlobReader`] layers a cursor on top and implements [`io::Read`] and
//! [`io::Seek`], so a blob can be handed to anything that consumes a stream.

use std::io::{self, SeekFrom};

use super::error::{DbError, DbResult, Resource};
use super::ffi::{self, RawBlob};

/// Schema a blob cell lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseName {
    /// The main database.
    #[default]
    Main,
    /// The temporary database.
    Temp,
}

impl DatabaseName {
    /// Schema name as the engine spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Temp => "temp",
        }
    }
}

/// Access mode requested when opening a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobMode {
    /// Reads only. Writes are rejected by the engine.
    #[default]
    ReadOnly,
    /// Reads and in-place writes. The blob size cannot change.
    ReadWrite,
}

fn range_error(offset: usize, len: usize, size: usize) -> DbError {
    DbError::BlobRange {
        offset: i128::try_from(offset).unwrap_or(i128::MAX),
        len,
        size,
    }
}

fn check_range(offset: usize, len: usize, size: usize) -> DbResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(range_error(offset, len, size)),
    }
}

/// An open handle on one blob cell.
///
/// The size is captured when the handle is opened or reopened; blobs cannot
/// be resized through this handle.
pub struct Blob<'conn> {
    raw: Option<RawBlob<'conn>>,
    size: usize,
    mode: BlobMode,
}

impl<'conn> Blob<'conn> {
    pub(super) fn new(raw: RawBlob<'conn>, mode: BlobMode) -> Self {
        let size = usize::try_from(raw.bytes()).unwrap_or(0);
        log::debug!("opened blob ({size} bytes, {mode:?})");
        Self {
            raw: Some(raw),
            size,
            mode,
        }
    }

    fn raw(&self) -> DbResult<&RawBlob<'conn>> {
        self.raw
            .as_ref()
            .ok_or(DbError::ResourceMisuse(Resource::Blob))
    }

    /// Size of the blob in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` when opened with [`BlobMode::ReadOnly`].
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.mode, BlobMode::ReadOnly)
    }

    /// Returns `true` once the handle has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.raw.is_none()
    }

    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`DbError::BlobRange`] when the range does not fit in the blob.
    pub fn read_range(&self, offset: usize, len: usize) -> DbResult<Vec<u8>> {
        self.raw()?;
        check_range(offset, len, self.size)?;
        let mut buf = vec![0; len];
        self.read_into(&mut buf, offset)?;
        Ok(buf)
    }

    /// Fills `buf` from `offset`.
    ///
    /// # Errors
    ///
    /// [`DbError::BlobRange`] when the range does not fit in the blob, or the
    /// engine failure (for example after the row was modified).
    pub fn read_into(&self, buf: &mut [u8], offset: usize) -> DbResult<()> {
        let raw = self.raw()?;
        check_range(offset, buf.len(), self.size)?;
        let rc = raw.read(buf, ffi::to_c_int(offset)?);
        if rc != ffi::SQLITE_OK {
            return Err(DbError::Engine(raw.last_error(rc)));
        }
        Ok(())
    }

    /// Overwrites `data.len()` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`DbError::BlobRange`] when the range does not fit, or the engine
    /// failure (`READONLY` for a read-only handle).
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> DbResult<()> {
        let raw = self.raw()?;
        check_range(offset, data.len(), self.size)?;
        let rc = raw.write(data, ffi::to_c_int(offset)?);
        if rc != ffi::SQLITE_OK {
            return Err(DbError::Engine(raw.last_error(rc)));
        }
        Ok(())
    }

    /// Points the handle at another row of the same table and column.
    ///
    /// # Errors
    ///
    /// The engine failure, for example when the row does not exist. The
    /// handle is unusable for I/O afterwards, but must still be closed.
    pub fn reopen(&mut self, row_id: i64) -> DbResult<()> {
        let raw = self.raw()?;
        let rc = raw.reopen(row_id);
        if rc != ffi::SQLITE_OK {
            return Err(DbError::Engine(raw.last_error(rc)));
        }
        self.size = usize::try_from(raw.bytes()).unwrap_or(0);
        Ok(())
    }

    /// Closes the handle. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// The engine's close result. The handle is released either way.
    pub fn close(&mut self) -> DbResult<()> {
        self.raw.take().map_or(Ok(()), |raw| {
            log::debug!("closing blob");
            raw.close().map_err(DbError::Engine)
        })
    }
}

impl std::fmt::Debug for Blob<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.size)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Outcome of one [`BlobReader::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes copied into the buffer.
    pub len: usize,
    /// `true` once the cursor has reached the end of the blob.
    pub eof: bool,
}

/// Cursor-based reader over a [`Blob`].
#[derive(Debug)]
pub struct BlobReader<'conn> {
    blob: Blob<'conn>,
    offset: usize,
}

impl<'conn> BlobReader<'conn> {
    /// Starts reading `blob` from offset 0.
    #[must_use]
    pub const fn new(blob: Blob<'conn>) -> Self {
        Self { blob, offset: 0 }
    }

    /// Current cursor offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the blob.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.blob.size().saturating_sub(self.offset)
    }

    /// Size of the underlying blob.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.blob.size()
    }

    const fn ensure_open(&self) -> DbResult<()> {
        if self.blob.is_closed() {
            Err(DbError::ResourceMisuse(Resource::Blob))
        } else {
            Ok(())
        }
    }

    /// Copies up to `buf.len()` bytes from the cursor and advances it.
    ///
    /// `eof` is set on the call that reaches the end, and on every call
    /// after that (with `len == 0`).
    ///
    /// # Errors
    ///
    /// [`DbError::ResourceMisuse`] once closed, or the engine read failure.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> DbResult<Chunk> {
        self.ensure_open()?;
        let n = buf.len().min(self.remaining());
        self.blob.read_into(&mut buf[..n], self.offset)?;
        self.offset += n;
        Ok(Chunk {
            len: n,
            eof: self.offset >= self.blob.size(),
        })
    }

    /// Positional read that leaves the cursor alone. Reading at exactly the
    /// end returns 0.
    ///
    /// # Errors
    ///
    /// [`DbError::BlobRange`] when `offset` is past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: usize) -> DbResult<usize> {
        self.ensure_open()?;
        let size = self.blob.size();
        if offset > size {
            return Err(range_error(offset, buf.len(), size));
        }
        let n = buf.len().min(size - offset);
        self.blob.read_into(&mut buf[..n], offset)?;
        Ok(n)
    }

    /// Moves the cursor. Targets outside `0..=size` are rejected and leave
    /// the cursor where it was.
    ///
    /// # Errors
    ///
    /// [`DbError::BlobRange`] for an out-of-range target.
    pub fn seek_to(&mut self, pos: SeekFrom) -> DbResult<u64> {
        self.ensure_open()?;
        let size = self.blob.size();
        let as_wide = |v: usize| i128::try_from(v).unwrap_or(i128::MAX);
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => as_wide(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => as_wide(size) + i128::from(delta),
        };
        match usize::try_from(target) {
            Ok(offset) if offset <= size => {
                self.offset = offset;
                Ok(u64::try_from(offset).unwrap_or(u64::MAX))
            }
            _ => Err(DbError::BlobRange {
                offset: target,
                len: 0,
                size,
            }),
        }
    }

    /// Closes the underlying blob. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// See [`Blob::close`].
    pub fn close(&mut self) -> DbResult<()> {
        self.blob.close()
    }

    /// Returns the underlying blob.
    #[must_use]
    pub fn into_blob(self) -> Blob<'conn> {
        self.blob
    }
}

impl io::Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?.len)
    }
}

impl io::Seek for BlobReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}
