//! SQLite-backed [`IndexSink`]: one connection behind a mutex, writes held in an open
//! transaction until commit.

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::IndexDocument;

use super::connection::{begin_replacement, document_count, open_db, open_db_in_memory};
use super::{DELETE_DOCUMENT_SQL, INSERT_DOCUMENT_SQL, IndexSink, SinkConfig, SinkStats};

struct SinkState {
    /// None once closed.
    conn: Option<Connection>,
    /// True while a write transaction is open.
    in_tx: bool,
}

impl SinkState {
    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("index sink already closed"))
    }

    /// Open a write transaction if none is pending.
    fn begin_if_needed(&mut self) -> Result<&Connection> {
        if !self.in_tx {
            self.conn()?
                .execute_batch("BEGIN")
                .context("begin transaction")?;
            self.in_tx = true;
        }
        self.conn()
    }

    fn commit_pending(&mut self) -> Result<()> {
        if self.in_tx {
            self.conn()?
                .execute_batch("COMMIT")
                .context("commit transaction")?;
            self.in_tx = false;
        }
        Ok(())
    }
}

pub struct SqliteSink {
    state: Mutex<SinkState>,
}

impl SqliteSink {
    /// Open the index database under `index_dir` and start replacing its contents. The
    /// previous index is only overwritten by [`IndexSink::commit`].
    pub fn open(index_dir: &Path, config: SinkConfig) -> Result<Self> {
        let conn = open_db(index_dir, &config)?;
        begin_replacement(&conn, &config)?;
        debug!(
            "Opened index sink at {} ({} MB buffer, similarity {})",
            index_dir.display(),
            config.memory_buffer_mb,
            config.similarity
        );
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory(config: SinkConfig) -> Result<Self> {
        let conn = open_db_in_memory(&config)?;
        begin_replacement(&conn, &config)?;
        Ok(Self::from_connection(conn))
    }

    /// A worker that panicked mid-write leaves the connection usable; keep going.
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `conn` must already be inside the replacing transaction.
    fn from_connection(conn: Connection) -> Self {
        Self {
            state: Mutex::new(SinkState {
                conn: Some(conn),
                in_tx: true,
            }),
        }
    }

    /// Run `f` against the underlying connection (reads in tests and reports).
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let state = self.lock();
        f(state.conn()?)
    }
}

/// Execute one document insert.
fn insert_document(conn: &Connection, doc: &IndexDocument) -> Result<()> {
    let fields = if doc.fields.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&doc.fields).context("encode fields")?)
    };
    let mut stmt = conn
        .prepare_cached(INSERT_DOCUMENT_SQL)
        .context("prepare insert")?;
    stmt.execute((
        doc.id.as_str(),
        doc.contents.as_deref(),
        doc.raw.as_deref(),
        fields.as_deref(),
    ))
    .context("insert document")?;
    Ok(())
}

impl IndexSink for SqliteSink {
    fn add_document(&self, doc: &IndexDocument) -> Result<()> {
        let mut state = self.lock();
        let conn = state.begin_if_needed()?;
        insert_document(conn, doc)
    }

    fn update_document(&self, key: &str, doc: &IndexDocument) -> Result<()> {
        // Delete and insert under one lock so concurrent upserts of a key cannot interleave.
        let mut state = self.lock();
        let conn = state.begin_if_needed()?;
        conn.prepare_cached(DELETE_DOCUMENT_SQL)
            .context("prepare delete")?
            .execute([key])
            .context("delete document")?;
        insert_document(conn, doc)
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.lock();
        state.commit_pending()?;
        state
            .conn()?
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("WAL checkpoint")?;
        Ok(())
    }

    fn force_merge(&self, target_segments: usize) -> Result<()> {
        let mut state = self.lock();
        state.commit_pending()?;
        if target_segments <= 1 {
            info!("Merging index into a single segment (VACUUM)...");
            state.conn()?.execute_batch("VACUUM").context("vacuum")?;
        } else {
            debug!(
                "Merge target {} segments: checkpoint only",
                target_segments
            );
            state
                .conn()?
                .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                .context("WAL checkpoint")?;
        }
        Ok(())
    }

    fn stats(&self) -> Result<SinkStats> {
        let state = self.lock();
        Ok(SinkStats {
            document_count: document_count(state.conn()?)?,
        })
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock();
        let in_tx = state.in_tx;
        state.in_tx = false;
        let Some(conn) = state.conn.take() else {
            return Ok(());
        };
        if in_tx {
            conn.execute_batch("ROLLBACK")
                .context("discard uncommitted writes")?;
        }
        conn.close()
            .map_err(|(_, e)| anyhow::Error::new(e).context("close database"))
    }
}
