//! Index sink: trait boundary plus the SQLite implementation (schema, open, write, commit).

mod connection;
mod sink;

pub use connection::{db_path_for, document_count, load_documents, open_db, open_db_in_memory};
pub use sink::SqliteSink;

use crate::{IndexDocument, Result, Similarity};

/// Stored row counts reported by a sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub document_count: u64,
}

/// Fixed for the lifetime of a sink handle; applied before any write.
#[derive(Clone, Copy, Debug)]
pub struct SinkConfig {
    pub similarity: Similarity,
    pub memory_buffer_mb: usize,
    /// Pages between automatic WAL checkpoints.
    pub autocheckpoint_pages: u32,
}

/// Destination for generated documents.
///
/// Implementations must accept concurrent callers: every worker in the pool writes through
/// the same handle. Nothing written becomes durable until [`IndexSink::commit`]; until then the
/// previously committed index, if any, is what readers see.
pub trait IndexSink: Send + Sync {
    fn add_document(&self, doc: &IndexDocument) -> Result<()>;

    /// Replace every stored document whose id equals `key` with `doc`.
    fn update_document(&self, key: &str, doc: &IndexDocument) -> Result<()>;

    fn commit(&self) -> Result<()>;

    /// Compact down to `target_segments` physical segments.
    fn force_merge(&self, target_segments: usize) -> Result<()>;

    fn stats(&self) -> Result<SinkStats>;

    /// Release the handle. Uncommitted writes are discarded and the previous index stands.
    fn close(&self) -> Result<()>;
}

/// WAL tuning pragmas. Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Append statement for the documents table.
pub(crate) const INSERT_DOCUMENT_SQL: &str =
    "INSERT INTO documents (doc_id, contents, raw, fields) VALUES (?1, ?2, ?3, ?4)";

pub(crate) const DELETE_DOCUMENT_SQL: &str = "DELETE FROM documents WHERE doc_id = ?1";

/// Run at the start of a replacing transaction.
pub(crate) const CLEAR_INDEX_SQL: &str = "DELETE FROM documents; DELETE FROM meta;";

pub(crate) const UPSERT_META_SQL: &str =
    "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)";

/// Schema for documents and meta tables.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id TEXT NOT NULL,
    contents TEXT,
    raw TEXT,
    fields TEXT
);
CREATE INDEX IF NOT EXISTS idx_documents_doc_id ON documents(doc_id);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
