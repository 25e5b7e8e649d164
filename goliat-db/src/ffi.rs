//! Raw handle wrappers over the `SQLite` C API.
//!
//! This is the **only** module that contains `unsafe` code or C types. Each
//! foreign resource gets exactly one owner type:
//!
//! * [`RawDb`] owns a `sqlite3*` and closes it with `sqlite3_close_v2`.
//! * [`RawStmt`] owns a `sqlite3_stmt*` and finalizes it.
//! * [`RawBlob`] owns a `sqlite3_blob*` and closes it.
//!
//! A live value of any of these types always holds a valid pointer. The safe
//! layer keeps them in an `Option` and releases by `take()`, so the release
//! path runs at most once and `Drop` is only the backstop for handles the
//! caller never closed explicitly.
//!
//! Strings handed to the engine are copied into a scoped `CString` that lives
//! for exactly one foreign call. Byte and text payloads are bound with
//! `SQLITE_TRANSIENT`, so the engine keeps its own copy.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::string::FromUtf8Error;

use libsqlite3_sys as sys;
use zeroize::Zeroizing;

use super::error::EngineError;

// ── Result and type constants ───────────────────────────────────────────

pub const SQLITE_OK: c_int = sys::SQLITE_OK;
pub const SQLITE_ROW: c_int = sys::SQLITE_ROW;
pub const SQLITE_DONE: c_int = sys::SQLITE_DONE;
pub const SQLITE_MISUSE: c_int = sys::SQLITE_MISUSE;
pub const SQLITE_TOOBIG: c_int = sys::SQLITE_TOOBIG;

pub const SQLITE_INTEGER: c_int = sys::SQLITE_INTEGER;
pub const SQLITE_FLOAT: c_int = sys::SQLITE_FLOAT;
pub const SQLITE_TEXT: c_int = sys::SQLITE_TEXT;
pub const SQLITE_BLOB: c_int = sys::SQLITE_BLOB;

pub const SQLITE_OPEN_READONLY: c_int = sys::SQLITE_OPEN_READONLY;
pub const SQLITE_OPEN_READWRITE: c_int = sys::SQLITE_OPEN_READWRITE;
pub const SQLITE_OPEN_CREATE: c_int = sys::SQLITE_OPEN_CREATE;
pub const SQLITE_OPEN_FULLMUTEX: c_int = sys::SQLITE_OPEN_FULLMUTEX;

/// Copies `s` into a NUL-terminated buffer for a single foreign call.
pub fn c_string(s: &str, what: &str) -> Result<CString, EngineError> {
    CString::new(s)
        .map_err(|e| EngineError::new(SQLITE_MISUSE, format!("nul in {what}: {e}")))
}

/// Copies a filesystem path into a NUL-terminated buffer, byte for byte.
#[cfg(unix)]
fn path_c_string(path: &Path) -> Result<CString, EngineError> {
    use std::os::unix::ffi::OsStrExt;

    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| EngineError::new(SQLITE_MISUSE, format!("nul in path: {e}")))
}

/// Copies a filesystem path into a NUL-terminated buffer. The engine takes
/// UTF-8 names, so paths that are not valid Unicode are rejected.
#[cfg(not(unix))]
fn path_c_string(path: &Path) -> Result<CString, EngineError> {
    let utf8 = path.to_str().ok_or_else(|| {
        EngineError::new(
            SQLITE_MISUSE,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })?;
    c_string(utf8, "path")
}

/// Converts a Rust length or index into a C `int`.
fn c_len(len: usize) -> Result<c_int, c_int> {
    c_int::try_from(len).map_err(|_| SQLITE_TOOBIG)
}

/// Reads a NUL-terminated string owned by the engine.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string that stays
/// alive for the duration of this call.
unsafe fn owned_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

// ── Connection handle ───────────────────────────────────────────────────

/// Owned `sqlite3*` handle.
pub struct RawDb {
    ptr: NonNull<sys::sqlite3>,
}

// Safety: the engine is built in serialized mode and the handle is opened
// with `SQLITE_OPEN_FULLMUTEX`. `RawDb` is not `Sync`, so at most one thread
// drives it at a time.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens `path` with the given `SQLITE_OPEN_*` flags.
    pub fn open(path: &Path, flags: c_int) -> Result<Self, EngineError> {
        let c_path = path_c_string(path)?;
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        match NonNull::new(db) {
            Some(ptr) if rc == SQLITE_OK => Ok(Self { ptr }),
            Some(ptr) => {
                // The engine hands out a handle even on failure; it carries
                // the message and must still be closed.
                let handle = Self { ptr };
                let err = handle.last_error(rc);
                drop(handle);
                Err(err)
            }
            None => Err(EngineError::new(
                rc,
                format!("sqlite3_open_v2 returned {rc} without a handle"),
            )),
        }
    }

    /// Closes the handle. On failure the handle is handed back still open.
    pub fn close(self) -> Result<(), (Self, EngineError)> {
        let rc = unsafe { sys::sqlite3_close_v2(self.ptr.as_ptr()) };
        if rc == SQLITE_OK {
            std::mem::forget(self);
            Ok(())
        } else {
            let err = self.last_error(rc);
            Err((self, err))
        }
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Runs one or more `;`-separated statements via `sqlite3_exec`.
    pub fn exec(&self, sql: &str) -> Result<(), EngineError> {
        let c_sql = c_string(sql, "SQL")?;
        self.exec_raw(c_sql.as_ptr())
    }

    /// Like [`exec`](Self::exec), but the temporary C copy of `sql` is
    /// zeroized once the call returns.
    pub fn exec_zeroized(&self, sql: &str) -> Result<(), EngineError> {
        if sql.as_bytes().contains(&0) {
            return Err(EngineError::new(SQLITE_MISUSE, "nul in SQL"));
        }
        let mut buf = Zeroizing::new(Vec::with_capacity(sql.len() + 1));
        buf.extend_from_slice(sql.as_bytes());
        buf.push(0);
        self.exec_raw(buf.as_ptr().cast())
    }

    fn exec_raw(&self, sql: *const c_char) -> Result<(), EngineError> {
        let mut errmsg: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            sys::sqlite3_exec(self.ptr.as_ptr(), sql, None, ptr::null_mut(), &mut errmsg)
        };
        if rc == SQLITE_OK {
            return Ok(());
        }
        let msg = if errmsg.is_null() {
            self.errmsg()
        } else {
            let s = unsafe { owned_str(errmsg) }.unwrap_or_default();
            unsafe { sys::sqlite3_free(errmsg.cast()) };
            s
        };
        Err(EngineError::new(rc, msg))
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Returns `Ok(None)` when `sql` holds no statement (blank or comment).
    pub fn prepare(&self, sql: &str) -> Result<Option<RawStmt<'_>>, EngineError> {
        let c_sql = c_string(sql, "SQL")?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            sys::sqlite3_prepare_v2(
                self.ptr.as_ptr(),
                c_sql.as_ptr(),
                -1,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != SQLITE_OK {
            return Err(self.last_error(rc));
        }
        Ok(NonNull::new(stmt).map(|ptr| RawStmt {
            ptr,
            db: self.ptr,
            _conn: PhantomData,
        }))
    }

    /// Opens an incremental I/O handle on one blob cell.
    pub fn blob_open(
        &self,
        database: &str,
        table: &str,
        column: &str,
        row_id: i64,
        writable: bool,
    ) -> Result<RawBlob<'_>, EngineError> {
        let c_database = c_string(database, "database name")?;
        let c_table = c_string(table, "table name")?;
        let c_column = c_string(column, "column name")?;
        let mut blob: *mut sys::sqlite3_blob = ptr::null_mut();
        let rc = unsafe {
            sys::sqlite3_blob_open(
                self.ptr.as_ptr(),
                c_database.as_ptr(),
                c_table.as_ptr(),
                c_column.as_ptr(),
                row_id,
                c_int::from(writable),
                &mut blob,
            )
        };
        if rc != SQLITE_OK {
            return Err(self.last_error(rc));
        }
        NonNull::new(blob)
            .map(|ptr| RawBlob {
                ptr,
                db: self.ptr,
                _conn: PhantomData,
            })
            .ok_or_else(|| EngineError::new(rc, "sqlite3_blob_open returned no handle"))
    }

    /// Sets the busy handler timeout in milliseconds.
    pub fn busy_timeout(&self, ms: c_int) -> Result<(), EngineError> {
        let rc = unsafe { sys::sqlite3_busy_timeout(self.ptr.as_ptr(), ms) };
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(self.last_error(rc))
        }
    }

    // ── Per-connection state ────────────────────────────────────────────

    pub fn errcode(&self) -> c_int {
        unsafe { sys::sqlite3_errcode(self.ptr.as_ptr()) }
    }

    pub fn errmsg(&self) -> String {
        errmsg_raw(self.ptr)
    }

    /// Pairs `code` with the connection's current message.
    pub fn last_error(&self, code: c_int) -> EngineError {
        EngineError::new(code, self.errmsg())
    }

    pub fn changes(&self) -> i64 {
        unsafe { sys::sqlite3_changes64(self.ptr.as_ptr()) }
    }

    pub fn last_insert_rowid(&self) -> i64 {
        unsafe { sys::sqlite3_last_insert_rowid(self.ptr.as_ptr()) }
    }

    pub fn is_autocommit(&self) -> bool {
        unsafe { sys::sqlite3_get_autocommit(self.ptr.as_ptr()) != 0 }
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        let rc = unsafe { sys::sqlite3_close_v2(self.ptr.as_ptr()) };
        if rc != SQLITE_OK {
            log::warn!("sqlite3_close_v2 failed on drop: {rc}");
        }
    }
}

fn errmsg_raw(db: NonNull<sys::sqlite3>) -> String {
    unsafe { owned_str(sys::sqlite3_errmsg(db.as_ptr())) }
        .unwrap_or_else(|| "unknown error".to_string())
}

// ── Statement handle ────────────────────────────────────────────────────

/// Owned `sqlite3_stmt*` handle, tied to the connection that prepared it.
pub struct RawStmt<'conn> {
    ptr: NonNull<sys::sqlite3_stmt>,
    /// Owning `sqlite3*`, kept for error messages.
    db: NonNull<sys::sqlite3>,
    _conn: PhantomData<&'conn RawDb>,
}

impl RawStmt<'_> {
    pub fn step(&self) -> c_int {
        unsafe { sys::sqlite3_step(self.ptr.as_ptr()) }
    }

    pub fn reset(&self) -> c_int {
        unsafe { sys::sqlite3_reset(self.ptr.as_ptr()) }
    }

    pub fn clear_bindings(&self) -> c_int {
        unsafe { sys::sqlite3_clear_bindings(self.ptr.as_ptr()) }
    }

    /// Pairs `code` with the owning connection's current message.
    pub fn last_error(&self, code: c_int) -> EngineError {
        EngineError::new(code, errmsg_raw(self.db))
    }

    /// Pairs the owning connection's current code with its message.
    pub fn snapshot(&self) -> EngineError {
        let code = unsafe { sys::sqlite3_errcode(self.db.as_ptr()) };
        self.last_error(code)
    }

    pub fn sql(&self) -> String {
        unsafe { owned_str(sys::sqlite3_sql(self.ptr.as_ptr())) }.unwrap_or_default()
    }

    // ── Binding (1-based indices) ───────────────────────────────────────

    pub fn parameter_count(&self) -> c_int {
        unsafe { sys::sqlite3_bind_parameter_count(self.ptr.as_ptr()) }
    }

    pub fn bind_null(&self, idx: c_int) -> c_int {
        unsafe { sys::sqlite3_bind_null(self.ptr.as_ptr(), idx) }
    }

    pub fn bind_int(&self, idx: c_int, value: i32) -> c_int {
        unsafe { sys::sqlite3_bind_int(self.ptr.as_ptr(), idx, value) }
    }

    pub fn bind_i64(&self, idx: c_int, value: i64) -> c_int {
        unsafe { sys::sqlite3_bind_int64(self.ptr.as_ptr(), idx, value) }
    }

    pub fn bind_double(&self, idx: c_int, value: f64) -> c_int {
        unsafe { sys::sqlite3_bind_double(self.ptr.as_ptr(), idx, value) }
    }

    pub fn bind_text(&self, idx: c_int, value: &str) -> c_int {
        let len = match c_len(value.len()) {
            Ok(len) => len,
            Err(rc) => return rc,
        };
        unsafe {
            sys::sqlite3_bind_text(
                self.ptr.as_ptr(),
                idx,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Binds a byte sequence. An empty slice binds a zero-length blob, not
    /// NULL (a null data pointer would bind NULL).
    pub fn bind_blob(&self, idx: c_int, value: &[u8]) -> c_int {
        if value.is_empty() {
            return unsafe { sys::sqlite3_bind_zeroblob(self.ptr.as_ptr(), idx, 0) };
        }
        let len = match c_len(value.len()) {
            Ok(len) => len,
            Err(rc) => return rc,
        };
        unsafe {
            sys::sqlite3_bind_blob(
                self.ptr.as_ptr(),
                idx,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    pub fn bind_zeroblob(&self, idx: c_int, size: u64) -> c_int {
        unsafe { sys::sqlite3_bind_zeroblob64(self.ptr.as_ptr(), idx, size) }
    }

    // ── Column reading (0-based indices) ────────────────────────────────

    pub fn column_count(&self) -> c_int {
        unsafe { sys::sqlite3_column_count(self.ptr.as_ptr()) }
    }

    pub fn column_name(&self, idx: c_int) -> Option<String> {
        unsafe { owned_str(sys::sqlite3_column_name(self.ptr.as_ptr(), idx)) }
    }

    pub fn column_type(&self, idx: c_int) -> c_int {
        unsafe { sys::sqlite3_column_type(self.ptr.as_ptr(), idx) }
    }

    pub fn column_int(&self, idx: c_int) -> i32 {
        unsafe { sys::sqlite3_column_int(self.ptr.as_ptr(), idx) }
    }

    pub fn column_i64(&self, idx: c_int) -> i64 {
        unsafe { sys::sqlite3_column_int64(self.ptr.as_ptr(), idx) }
    }

    pub fn column_double(&self, idx: c_int) -> f64 {
        unsafe { sys::sqlite3_column_double(self.ptr.as_ptr(), idx) }
    }

    /// Reads a column as UTF-8 text. Returns an empty string for NULL.
    /// Bytes that are not valid UTF-8 are returned as an error, never
    /// replaced.
    pub fn column_text(&self, idx: c_int) -> Result<String, FromUtf8Error> {
        let bytes = unsafe {
            let ptr = sys::sqlite3_column_text(self.ptr.as_ptr(), idx);
            let len = sys::sqlite3_column_bytes(self.ptr.as_ptr(), idx);
            let len = usize::try_from(len).unwrap_or(0);
            if ptr.is_null() || len == 0 {
                return Ok(String::new());
            }
            std::slice::from_raw_parts(ptr, len).to_vec()
        };
        String::from_utf8(bytes)
    }

    /// Reads a column as a blob. Returns an empty `Vec` for NULL.
    pub fn column_blob(&self, idx: c_int) -> Vec<u8> {
        unsafe {
            let ptr = sys::sqlite3_column_blob(self.ptr.as_ptr(), idx);
            let len = sys::sqlite3_column_bytes(self.ptr.as_ptr(), idx);
            let len = usize::try_from(len).unwrap_or(0);
            if ptr.is_null() || len == 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
        }
    }
}

impl RawStmt<'_> {
    /// Finalizes the statement and returns the engine's result code. The
    /// handle is gone whatever the code is.
    pub fn finalize(self) -> c_int {
        let rc = unsafe { sys::sqlite3_finalize(self.ptr.as_ptr()) };
        std::mem::forget(self);
        rc
    }
}

impl Drop for RawStmt<'_> {
    fn drop(&mut self) {
        // The return value echoes the last step error, which was already
        // reported by the step that produced it.
        unsafe {
            sys::sqlite3_finalize(self.ptr.as_ptr());
        }
    }
}

// ── Blob handle ─────────────────────────────────────────────────────────

/// Owned `sqlite3_blob*` handle, tied to the connection that opened it.
pub struct RawBlob<'conn> {
    ptr: NonNull<sys::sqlite3_blob>,
    db: NonNull<sys::sqlite3>,
    _conn: PhantomData<&'conn RawDb>,
}

impl RawBlob<'_> {
    pub fn bytes(&self) -> c_int {
        unsafe { sys::sqlite3_blob_bytes(self.ptr.as_ptr()) }
    }

    /// Fills `buf` from `offset`. The caller bounds-checks against `bytes()`.
    pub fn read(&self, buf: &mut [u8], offset: c_int) -> c_int {
        if buf.is_empty() {
            return SQLITE_OK;
        }
        let len = match c_len(buf.len()) {
            Ok(len) => len,
            Err(rc) => return rc,
        };
        unsafe { sys::sqlite3_blob_read(self.ptr.as_ptr(), buf.as_mut_ptr().cast(), len, offset) }
    }

    /// Writes `data` at `offset`. The caller bounds-checks against `bytes()`.
    pub fn write(&self, data: &[u8], offset: c_int) -> c_int {
        if data.is_empty() {
            return SQLITE_OK;
        }
        let len = match c_len(data.len()) {
            Ok(len) => len,
            Err(rc) => return rc,
        };
        unsafe { sys::sqlite3_blob_write(self.ptr.as_ptr(), data.as_ptr().cast(), len, offset) }
    }

    pub fn reopen(&self, row_id: i64) -> c_int {
        unsafe { sys::sqlite3_blob_reopen(self.ptr.as_ptr(), row_id) }
    }

    /// Pairs `code` with the owning connection's current message.
    pub fn last_error(&self, code: c_int) -> EngineError {
        EngineError::new(code, errmsg_raw(self.db))
    }

    /// Closes the handle, reporting the close result.
    pub fn close(self) -> Result<(), EngineError> {
        let rc = unsafe { sys::sqlite3_blob_close(self.ptr.as_ptr()) };
        let result = if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(self.last_error(rc))
        };
        // The handle is gone whatever the result code was.
        std::mem::forget(self);
        result
    }
}

impl Drop for RawBlob<'_> {
    fn drop(&mut self) {
        let rc = unsafe { sys::sqlite3_blob_close(self.ptr.as_ptr()) };
        if rc != SQLITE_OK {
            log::warn!("sqlite3_blob_close failed on drop: {rc}");
        }
    }
}

/// Converts an index or length the safe layer has already range-checked.
pub fn to_c_int(value: usize) -> Result<c_int, EngineError> {
    c_len(value).map_err(|rc| EngineError::new(rc, format!("{value} does not fit in a C int")))
}
