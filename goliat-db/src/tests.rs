//! Unit tests for the safe `SQLite` wrapper.

use std::io::{Read, Seek, SeekFrom};

use test_case::test_case;

use super::*;

fn open() -> Connection {
    Connection::open_in_memory().expect("open in-memory db")
}

fn open_with_blob(data: &[u8]) -> Connection {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, data BLOB);")
        .expect("create table");
    conn.exec("INSERT INTO t (id, data) VALUES (1, ?1)", params![data])
        .expect("insert");
    conn
}

// ── Connection ──────────────────────────────────────────────────────────

#[test]
fn test_open_in_memory() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT);")
        .expect("create table");
    conn.execute(
        "INSERT INTO t (id, val) VALUES (?1, ?2)",
        params![Value::Integer(1), Value::from("hello")],
    )
    .expect("insert");
    let result = conn
        .query_row("SELECT val FROM t WHERE id = ?1", params![1_i64], |row| {
            row.get::<String>(0)
        })
        .expect("query");
    assert_eq!(result, "hello");
}

#[test]
fn test_create_insert_rowid_and_changes() {
    let conn = open();
    let mut create = conn.prepare("CREATE TABLE foo (bar)").expect("prepare");
    assert_eq!(create.step().expect("step"), StepResult::Done);
    create.close().expect("close");

    let mut insert = conn.prepare("INSERT INTO foo VALUES (?1)").expect("prepare");
    insert.bind(params![42_i64]).expect("bind");
    assert_eq!(insert.step().expect("step"), StepResult::Done);
    assert_eq!(conn.last_insert_rowid(), 1);
    assert_eq!(conn.changes(), 1);
}

#[test]
fn test_execute_reports_changes() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (2), (3);")
        .expect("seed");
    let changed = conn
        .execute("UPDATE t SET id = id + 10 WHERE id > ?1", params![1_i64])
        .expect("update");
    assert_eq!(changed, 2);
}

#[test]
fn test_query_row_optional_none() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    let result = conn
        .query_row_optional("SELECT id FROM t WHERE id = 999", &[], |row| {
            row.get::<i64>(0)
        })
        .expect("query");
    assert!(result.is_none());
}

#[test]
fn test_query_row_no_rows() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    let err = conn
        .query_row("SELECT id FROM t", &[], |row| row.get::<i64>(0))
        .expect_err("empty table");
    assert!(err.is_no_rows());
}

#[test]
fn test_query_row_reports_step_failure() {
    let conn = open();
    let err = conn
        .query_row("SELECT abs(?1)", params![i64::MIN], |row| row.get::<i64>(0))
        .expect_err("integer overflow");
    assert!(matches!(err, DbError::Step(_)), "{err:?}");
}

#[test]
fn test_prepare_errors() {
    let conn = open();
    let err = conn.prepare("SELEC 1").expect_err("syntax error");
    assert!(matches!(err, DbError::Prepare(_)));
    assert_eq!(err.code(), Some(ErrorCode::ERROR));
    assert_eq!(conn.last_error_code(), ErrorCode::ERROR);
    assert!(conn.last_error_message().contains("syntax error"));

    let err = conn.prepare("  -- nothing").expect_err("no statement");
    assert!(matches!(err, DbError::Prepare(_)));
    assert_eq!(err.code(), Some(ErrorCode::MISUSE));

    let err = conn.prepare("SELECT '\0'").expect_err("interior nul");
    assert_eq!(err.code(), Some(ErrorCode::MISUSE));
}

#[test]
fn test_close_is_idempotent() {
    let mut conn = open();
    conn.close().expect("close");
    conn.close().expect("second close");
    assert!(conn.is_closed());

    let err = conn.prepare("SELECT 1").expect_err("closed");
    assert_eq!(err, DbError::ResourceMisuse(Resource::Connection));
    assert_eq!(conn.last_error_code(), ErrorCode::MISUSE);
    assert_eq!(conn.changes(), 0);
    assert_eq!(conn.last_insert_rowid(), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn test_execute_batch_zeroized() {
    let conn = open();
    conn.execute_batch_zeroized("CREATE TABLE s (v TEXT); INSERT INTO s VALUES ('secret');")
        .expect("batch");
    let v: String = conn
        .query_row("SELECT v FROM s", &[], |row| row.get(0))
        .expect("query");
    assert_eq!(v, "secret");
}

#[test]
fn test_integrity_check() {
    let conn = open();
    assert!(conn.integrity_check().expect("check"));
}

// ── Statement ───────────────────────────────────────────────────────────

#[test]
fn test_step_after_exhausted_returns_done() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT 1").expect("prepare");
    assert_eq!(stmt.state(), CursorState::Ready);
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    assert_eq!(stmt.state(), CursorState::HasRow);
    assert_eq!(stmt.column::<i64>(0).expect("column"), 1);
    assert_eq!(stmt.step().expect("step"), StepResult::Done);
    assert_eq!(stmt.state(), CursorState::Exhausted);
    assert_eq!(stmt.step().expect("step"), StepResult::Done);
    assert!(stmt.row().expect_err("no row").is_no_rows());

    stmt.reset().expect("reset");
    assert_eq!(stmt.state(), CursorState::Ready);
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
}

#[test]
fn test_reset_when_ready_is_noop() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?1").expect("prepare");
    stmt.bind_value(1, &5_i64).expect("bind");
    stmt.reset().expect("reset before any step");
    stmt.reset().expect("second reset");
    assert_eq!(stmt.state(), CursorState::Ready);
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    assert_eq!(stmt.column::<i64>(0).expect("binding kept"), 5);
}

#[test]
fn test_step_failure_is_latched_until_reset() {
    let conn = open();
    conn.execute_batch("CREATE TABLE u (k INTEGER UNIQUE); INSERT INTO u VALUES (1);")
        .expect("seed");
    let mut stmt = conn.prepare("INSERT INTO u VALUES (?1)").expect("prepare");
    stmt.bind(params![1_i64]).expect("bind");

    let first = stmt.step().expect_err("constraint");
    assert!(matches!(first, DbError::Step(_)));
    assert_eq!(
        first.code().map(ErrorCode::primary),
        Some(ErrorCode::CONSTRAINT)
    );
    assert_eq!(stmt.state(), CursorState::Failed);
    assert_eq!(stmt.step().expect_err("latched"), first);

    stmt.reset().expect("reset after failure");
    assert_eq!(stmt.state(), CursorState::Ready);
    stmt.bind_value(1, &2_i64).expect("rebind");
    assert_eq!(stmt.step().expect("step"), StepResult::Done);
}

#[test]
fn test_close_after_failed_step() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT abs(?1)").expect("prepare");
    stmt.bind(params![i64::MIN]).expect("bind");
    stmt.step().expect_err("integer overflow");
    stmt.close().expect("close is not an error path");
    assert!(stmt.is_closed());
    assert_eq!(
        stmt.step().expect_err("closed"),
        DbError::ResourceMisuse(Resource::Statement)
    );
}

#[test]
fn test_bind_arity_mismatch() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?1, ?2").expect("prepare");
    assert_eq!(stmt.parameter_count(), 2);
    let err = stmt.bind(params![1_i64]).expect_err("too few");
    assert_eq!(
        err,
        DbError::Bind(BindError::ArityMismatch {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn test_bind_requires_reset() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?1").expect("prepare");
    stmt.bind(params![1_i64]).expect("bind");
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    let err = stmt.bind_value(1, &2_i64).expect_err("running");
    assert!(matches!(err, DbError::Bind(BindError::Engine(_))));
    assert_eq!(err.code(), Some(ErrorCode::MISUSE));
}

#[test]
fn test_bind_index_out_of_range() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?1").expect("prepare");
    let err = stmt.bind_value(2, "x").expect_err("no such parameter");
    assert_eq!(err.code(), Some(ErrorCode::RANGE));
}

#[test]
fn test_clear_bindings_nulls_parameters() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?1").expect("prepare");
    stmt.bind(params!["x"]).expect("bind");
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    stmt.clear_bindings().expect("clear");
    assert_eq!(stmt.state(), CursorState::Ready);
    assert_eq!(stmt.step().expect("step"), StepResult::Row);
    assert_eq!(stmt.column::<Option<String>>(0).expect("column"), None);
}

#[test]
fn test_statement_metadata() {
    let conn = open();
    let stmt = conn.prepare("SELECT 1 AS one, 'a' AS two").expect("prepare");
    assert_eq!(stmt.column_count(), 2);
    assert_eq!(stmt.column_name(1).as_deref(), Some("two"));
    assert_eq!(stmt.column_name(2), None);
    assert_eq!(stmt.sql().as_deref(), Some("SELECT 1 AS one, 'a' AS two"));
}

#[test]
fn test_statement_close_is_idempotent() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT 1").expect("prepare");
    stmt.close().expect("close");
    stmt.close().expect("second close");
    assert!(stmt.is_closed());
    assert_eq!(
        stmt.step().expect_err("closed"),
        DbError::ResourceMisuse(Resource::Statement)
    );
    assert_eq!(stmt.parameter_count(), 0);
}

// ── Value codec ─────────────────────────────────────────────────────────

#[test_case(Value::Integer(42) ; "integer")]
#[test_case(Value::Integer(i64::MIN) ; "integer min")]
#[test_case(Value::Float(1.5) ; "float")]
#[test_case(Value::Text("héllo".into()) ; "text")]
#[test_case(Value::Text(String::new()) ; "empty text")]
#[test_case(Value::Blob(vec![0, 1, 2, 0xff]) ; "blob")]
#[test_case(Value::Null ; "null")]
fn test_value_round_trip(value: Value) {
    let conn = open();
    let back: Value = conn
        .query_row("SELECT ?1", params![value], |row| row.get(0))
        .expect("query");
    assert_eq!(back, value);
}

#[test]
fn test_native_round_trip() {
    let conn = open();
    let (b, i, l, f, s, v): (bool, i32, i64, f64, String, Vec<u8>) = conn
        .query_row(
            "SELECT ?1, ?2, ?3, ?4, ?5, ?6",
            params![true, -7_i32, 1_i64 << 40, 0.25_f64, "txt", vec![3_u8, 4]],
            |row| row.scan(),
        )
        .expect("query");
    assert!(b);
    assert_eq!(i, -7);
    assert_eq!(l, 1 << 40);
    assert!((f - 0.25).abs() < f64::EPSILON);
    assert_eq!(s, "txt");
    assert_eq!(v, [3, 4]);
}

#[test]
fn test_empty_blob_binds_as_blob() {
    let conn = open();
    let (kind, len): (String, i64) = conn
        .query_row(
            "SELECT typeof(?1), length(?1)",
            params![Vec::<u8>::new()],
            |row| row.scan(),
        )
        .expect("query");
    assert_eq!(kind, "blob");
    assert_eq!(len, 0);
}

#[test]
fn test_zero_blob_reads_back_zeroed() {
    let conn = open();
    let data: Vec<u8> = conn
        .query_row("SELECT ?1", params![ZeroBlob(8)], |row| row.get(0))
        .expect("query");
    assert_eq!(data, [0; 8]);
}

#[test]
fn test_null_handling() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT);")
        .expect("create table");
    conn.execute(
        "INSERT INTO t (id, val) VALUES (?1, ?2)",
        params![1_i64, None::<String>],
    )
    .expect("insert");
    let (is_null, val, kind): (bool, Option<String>, ColumnType) = conn
        .query_row("SELECT val IS NULL, val, val FROM t WHERE id = 1", &[], |row| {
            assert!(row.value(1)?.is_null());
            row.scan()
        })
        .expect("query");
    assert!(is_null);
    assert_eq!(val, None);
    assert_eq!(kind, ColumnType::Null);
}

#[test]
fn test_extract_arity_mismatch() {
    let conn = open();
    let err = conn
        .query_row("SELECT 1, 2", &[], |row| row.scan::<(i64,)>())
        .expect_err("one destination for two columns");
    assert_eq!(
        err,
        DbError::Extract(ExtractError::ArityMismatch {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn test_extract_errors() {
    let conn = open();
    conn.query_row("SELECT 'abc'", &[], |row| {
        let err = row.value(0)?.as_i64().expect_err("text is not an integer");
        assert_eq!(
            err,
            DbError::Extract(ExtractError::TypeMismatch {
                index: 0,
                expected: "integer",
                found: "text"
            })
        );
        let err = row.get::<f32>(0).expect_err("f32 unsupported");
        assert!(matches!(
            err,
            DbError::Extract(ExtractError::UnsupportedType(_))
        ));
        let err = row.get::<i64>(5).expect_err("out of range");
        assert!(matches!(
            err,
            DbError::Extract(ExtractError::IndexOutOfRange { index: 5, count: 1 })
        ));
        Ok(())
    })
    .expect("query");
}

#[test]
fn test_invalid_utf8_text_is_rejected() {
    let conn = open();
    conn.query_row("SELECT CAST(x'61ff62' AS TEXT)", &[], |row| {
        let value = row.value(0)?;
        assert_eq!(value.kind(), ColumnType::Text);
        let expected = DbError::Extract(ExtractError::InvalidUtf8 { index: 0 });
        assert_eq!(row.get::<String>(0).expect_err("native"), expected);
        assert_eq!(value.as_text().expect_err("checked"), expected);
        assert_eq!(row.get::<Value>(0).expect_err("dynamic"), expected);
        assert_eq!(row.get::<Vec<u8>>(0)?, [0x61, 0xff, 0x62]);
        Ok(())
    })
    .expect("query");
}

#[derive(Debug, PartialEq)]
struct Celsius(f64);

impl ToBindValue for Celsius {
    fn to_bind_value(&self) -> DbResult<BindValue> {
        Ok(BindValue::Float(self.0))
    }
}

impl FromColumn for Celsius {
    fn from_column(value: &ColumnValue<'_>) -> DbResult<Self> {
        value.as_f64().map(Self)
    }
}

#[test]
fn test_custom_codec_types() {
    let conn = open();
    conn.execute_batch("CREATE TABLE temps (c REAL);")
        .expect("create table");
    conn.exec("INSERT INTO temps VALUES (?1)", params![Celsius(21.5)])
        .expect("insert");
    let back: Celsius = conn
        .query_row("SELECT c FROM temps", &[], |row| row.get(0))
        .expect("query");
    assert_eq!(back, Celsius(21.5));

    let err = conn
        .query_row("SELECT 'warm'", &[], |row| row.get::<Celsius>(0))
        .expect_err("text is not a float");
    assert!(matches!(
        err,
        DbError::Extract(ExtractError::TypeMismatch { .. })
    ));
}

// ── Rows ────────────────────────────────────────────────────────────────

#[test]
fn test_rows_iteration() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER, name TEXT); INSERT INTO t VALUES (1, 'a'), (2, 'b');")
        .expect("seed");
    let mut rows = conn
        .query("SELECT id, name FROM t ORDER BY id", &[])
        .expect("query");
    assert!(rows.scan::<(i64, String)>().expect_err("before advance").is_no_rows());

    let mut seen = Vec::new();
    while rows.advance() {
        seen.push(rows.scan::<(i64, String)>().expect("scan"));
    }
    assert!(rows.is_done());
    assert!(rows.error().is_none());
    assert!(!rows.advance());
    assert!(rows.get::<i64>(0).expect_err("after end").is_no_rows());
    rows.close().expect("close");
    rows.close().expect("second close");

    assert_eq!(seen, [(1, "a".to_string()), (2, "b".to_string())]);
}

#[test]
fn test_rows_latch_step_failure() {
    let conn = open();
    let mut rows = conn
        .query("SELECT abs(?1)", params![i64::MIN])
        .expect("query");
    assert!(!rows.advance());
    assert!(!rows.is_done());
    assert!(matches!(rows.error(), Some(DbError::Step(_))));
    assert!(!rows.advance());
}

#[test]
fn test_query_map() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (3), (1), (2);")
        .expect("seed");
    let ids: Vec<(i64,)> = conn
        .query_map("SELECT id FROM t ORDER BY id", &[])
        .expect("query");
    assert_eq!(ids, [(1,), (2,), (3,)]);

    let mut mapped = conn
        .query("SELECT 'x'", &[])
        .expect("query")
        .mapped::<(i64, i64)>();
    assert!(matches!(
        mapped.next(),
        Some(Err(DbError::Extract(ExtractError::ArityMismatch { .. })))
    ));
    assert!(mapped.next().is_none());
}

// ── Transaction ─────────────────────────────────────────────────────────

#[test]
fn test_transaction_commit() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    {
        let tx = conn.transaction().expect("begin tx");
        assert!(!tx.is_autocommit());
        tx.execute("INSERT INTO t (id) VALUES (?1)", params![42_i64])
            .expect("insert");
        tx.commit().expect("commit");
    }
    assert!(conn.is_autocommit());
    let result = conn
        .query_row("SELECT id FROM t WHERE id = 42", &[], |row| {
            row.get::<i64>(0)
        })
        .expect("query");
    assert_eq!(result, 42);
}

#[test]
fn test_transaction_rollback_on_drop() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    {
        let tx = conn
            .transaction_with(TransactionBehavior::Immediate)
            .expect("begin tx");
        tx.execute("INSERT INTO t (id) VALUES (?1)", params![99_i64])
            .expect("insert");
        // Drop without commit -> rollback
    }
    assert!(conn.is_autocommit());
    let result = conn
        .query_row_optional("SELECT id FROM t WHERE id = 99", &[], |row| {
            row.get::<i64>(0)
        })
        .expect("query");
    assert!(result.is_none());
}

#[test]
fn test_transaction_explicit_rollback() {
    let conn = open();
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .expect("create table");
    let tx = conn
        .transaction_with(TransactionBehavior::Exclusive)
        .expect("begin tx");
    tx.exec("INSERT INTO t (id) VALUES (7)", &[]).expect("insert");
    tx.rollback().expect("rollback");
    let count: i64 = conn
        .query_row("SELECT count(*) FROM t", &[], |row| row.get(0))
        .expect("query");
    assert_eq!(count, 0);
}

#[test]
fn test_nested_begin_fails() {
    let conn = open();
    let _tx = conn.transaction().expect("begin tx");
    let err = conn.transaction().expect_err("nested");
    assert_eq!(err.code(), Some(ErrorCode::ERROR));
}

// ── Blob ────────────────────────────────────────────────────────────────

#[test]
fn test_blob_round_trip() {
    let data = vec![0xDE, 0xAD, 0xBE, 0xEF];
    let conn = open_with_blob(&data);
    let result = conn
        .query_row("SELECT data FROM t WHERE id = 1", &[], |row| {
            row.get::<Vec<u8>>(0)
        })
        .expect("query");
    assert_eq!(result, data);
}

#[test]
fn test_blob_read_range() {
    let conn = open_with_blob(&[0, 1, 2, 3]);
    let mut blob = conn
        .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadOnly)
        .expect("open blob");
    assert_eq!(blob.size(), 4);
    assert!(blob.is_read_only());
    assert_eq!(blob.read_range(1, 2).expect("read"), [1, 2]);
    assert_eq!(blob.read_range(4, 0).expect("empty read"), Vec::<u8>::new());
    assert_eq!(
        blob.read_range(3, 2).expect_err("past end"),
        DbError::BlobRange {
            offset: 3,
            len: 2,
            size: 4
        }
    );
    assert_eq!(
        blob.read_range(1, usize::MAX).expect_err("oversized"),
        DbError::BlobRange {
            offset: 1,
            len: usize::MAX,
            size: 4
        }
    );

    blob.close().expect("close");
    blob.close().expect("second close");
    assert_eq!(
        blob.read_range(0, 1).expect_err("closed"),
        DbError::ResourceMisuse(Resource::Blob)
    );
}

#[test]
fn test_blob_write_and_reopen() {
    let conn = open_with_blob(&[0, 1, 2, 3]);
    conn.exec("INSERT INTO t (id, data) VALUES (2, ?1)", params![ZeroBlob(6)])
        .expect("insert");
    {
        let mut blob = conn
            .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadWrite)
            .expect("open blob");
        blob.write_at(2, &[9, 9]).expect("write");
        assert!(matches!(
            blob.write_at(3, &[1, 1]).expect_err("would extend"),
            DbError::BlobRange { .. }
        ));
        blob.reopen(2).expect("reopen");
        assert_eq!(blob.size(), 6);
        blob.write_at(0, &[5; 6]).expect("fill");
        blob.close().expect("close");
    }
    let rows: Vec<(Vec<u8>,)> = conn
        .query_map("SELECT data FROM t ORDER BY id", &[])
        .expect("query");
    assert_eq!(rows, [(vec![0, 1, 9, 9],), (vec![5; 6],)]);
}

#[test]
fn test_blob_write_read_only_rejected() {
    let conn = open_with_blob(&[0, 1]);
    let mut blob = conn
        .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadOnly)
        .expect("open blob");
    let err = blob.write_at(0, &[1]).expect_err("read-only");
    assert_eq!(err.code(), Some(ErrorCode::READONLY));
}

#[test]
fn test_blob_open_missing_row() {
    let conn = open_with_blob(&[0]);
    let err = conn
        .blob_open(DatabaseName::Main, "t", "data", 42, BlobMode::ReadOnly)
        .expect_err("no such row");
    assert!(matches!(err, DbError::Engine(_)));
}

#[test]
fn test_blob_reader_chunks() {
    let data: Vec<u8> = (0..10).collect();
    let conn = open_with_blob(&data);
    let blob = conn
        .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadOnly)
        .expect("open blob");
    let mut reader = BlobReader::new(blob);

    let mut seen = Vec::new();
    let mut chunks = Vec::new();
    let mut buf = [0_u8; 4];
    loop {
        let chunk = reader.read_chunk(&mut buf).expect("read");
        seen.extend_from_slice(&buf[..chunk.len]);
        chunks.push(chunk);
        if chunk.eof {
            break;
        }
    }
    assert_eq!(
        chunks,
        [
            Chunk { len: 4, eof: false },
            Chunk { len: 4, eof: false },
            Chunk { len: 2, eof: true },
        ]
    );
    assert_eq!(reader.position(), 10);
    assert_eq!(reader.remaining(), 0);
    assert_eq!(
        reader.read_chunk(&mut buf).expect("at end"),
        Chunk { len: 0, eof: true }
    );

    let mut whole = vec![0; 10];
    assert_eq!(reader.read_at(&mut whole, 0).expect("read_at"), 10);
    assert_eq!(seen, whole);
    assert_eq!(reader.read_at(&mut buf, 10).expect("at size"), 0);
    assert!(matches!(
        reader.read_at(&mut buf, 11).expect_err("past size"),
        DbError::BlobRange { .. }
    ));
}

#[test]
fn test_blob_reader_last_chunk_fills_buffer() {
    let data: Vec<u8> = (0..8).collect();
    let conn = open_with_blob(&data);
    let blob = conn
        .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadOnly)
        .expect("open blob");
    let mut reader = BlobReader::new(blob);

    let mut buf = [0_u8; 4];
    assert_eq!(
        reader.read_chunk(&mut buf).expect("first"),
        Chunk { len: 4, eof: false }
    );
    assert_eq!(buf, [0, 1, 2, 3]);
    assert_eq!(
        reader.read_chunk(&mut buf).expect("last"),
        Chunk { len: 4, eof: true }
    );
    assert_eq!(buf, [4, 5, 6, 7]);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_blob_reader_seek_bounds() {
    let data: Vec<u8> = (0..10).collect();
    let conn = open_with_blob(&data);
    let blob = conn
        .blob_open(DatabaseName::Main, "t", "data", 1, BlobMode::ReadOnly)
        .expect("open blob");
    let mut reader = BlobReader::new(blob);

    assert_eq!(reader.seek(SeekFrom::End(0)).expect("end"), 10);
    let err = reader.seek(SeekFrom::Current(1)).expect_err("past end");
    assert!(matches!(
        DbError::from_io(&err),
        Some(DbError::BlobRange { offset: 11, .. })
    ));
    assert_eq!(reader.position(), 10);

    assert_eq!(reader.seek(SeekFrom::Start(3)).expect("start"), 3);
    assert_eq!(reader.seek(SeekFrom::Start(3)).expect("same offset"), 3);
    assert_eq!(reader.seek_to(SeekFrom::Current(0)).expect("stay"), 3);
    assert!(reader.seek(SeekFrom::Current(-4)).is_err());
    assert_eq!(reader.position(), 3);

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).expect("read to end");
    assert_eq!(rest, (3..10).collect::<Vec<u8>>());

    reader.close().expect("close");
    let err = reader.read(&mut [0; 1]).expect_err("closed");
    assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    assert!(reader.into_blob().is_closed());
}
