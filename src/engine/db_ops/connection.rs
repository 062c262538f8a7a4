//! Open and read the index database.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::IndexDocument;
use crate::utils::config::{PackagePaths, SinkConsts};

use super::{CLEAR_INDEX_SQL, SCHEMA, SinkConfig, UPSERT_META_SQL, WAL_PRAGMAS};

/// Database file inside an index directory.
pub fn db_path_for(index_dir: &Path) -> PathBuf {
    index_dir.join(PackagePaths::get().db_filename())
}

/// Page cache in KiB for a memory buffer given in MB (negative `cache_size` means KiB).
fn cache_size_kib(memory_buffer_mb: usize) -> usize {
    memory_buffer_mb
        .saturating_mul(1024)
        .clamp(1024, SinkConsts::MAX_CACHE_KIB)
}

/// Apply WAL, cache sizing and schema to an open connection. Existing rows are left alone.
fn apply_config_and_schema(conn: &Connection, config: &SinkConfig, wal: bool) -> Result<()> {
    if wal {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .context("enable WAL")?;
        conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    }
    conn.pragma_update(None, "wal_autocheckpoint", config.autocheckpoint_pages)
        .context("set wal_autocheckpoint")?;
    conn.pragma_update(
        None,
        "cache_size",
        -(cache_size_kib(config.memory_buffer_mb) as i64),
    )
    .context("set cache_size")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Open a write transaction that replaces the stored index: clears documents and records
/// the sink config. Nothing is visible to other readers until the transaction commits.
pub(crate) fn begin_replacement(conn: &Connection, config: &SinkConfig) -> Result<()> {
    conn.execute_batch("BEGIN").context("begin transaction")?;
    conn.execute_batch(CLEAR_INDEX_SQL)
        .context("clear previous index")?;
    conn.execute(UPSERT_META_SQL, ("similarity", config.similarity.to_string()))
        .context("record similarity")?;
    conn.execute(
        UPSERT_META_SQL,
        ("memory_buffer_mb", config.memory_buffer_mb.to_string()),
    )
    .context("record memory buffer")?;
    Ok(())
}

/// Create the index directory if needed and open the database inside it, creating the
/// schema when missing. A previous index stays intact until a sink commits over it.
pub fn open_db(index_dir: &Path, config: &SinkConfig) -> Result<Connection> {
    std::fs::create_dir_all(index_dir)
        .with_context(|| format!("create index directory {}", index_dir.display()))?;
    let path = db_path_for(index_dir);

    let conn = Connection::open(&path)
        .with_context(|| format!("open database {}", path.display()))?;
    apply_config_and_schema(&conn, config, true)?;
    Ok(conn)
}

/// Open an in-memory DB with the same schema (no WAL).
pub fn open_db_in_memory(config: &SinkConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    apply_config_and_schema(&conn, config, false)?;
    Ok(conn)
}

/// Number of rows in the documents table.
pub fn document_count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))
        .context("count documents")?;
    Ok(n.max(0) as u64)
}

/// Load every stored document in write order.
pub fn load_documents(conn: &Connection) -> Result<Vec<IndexDocument>> {
    let mut stmt = conn
        .prepare("SELECT doc_id, contents, raw, fields FROM documents ORDER BY seq")
        .context("prepare select")?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let contents: Option<String> = row.get(1)?;
        let raw: Option<String> = row.get(2)?;
        let fields: Option<String> = row.get(3)?;
        Ok((id, contents, raw, fields))
    })?;
    let mut docs = Vec::new();
    for row in rows {
        let (id, contents, raw, fields) = row?;
        let fields: BTreeMap<String, String> = match fields {
            Some(s) => serde_json::from_str(&s).context("decode stored fields")?,
            None => BTreeMap::new(),
        };
        docs.push(IndexDocument {
            id,
            contents,
            raw,
            fields,
        });
    }
    Ok(docs)
}
