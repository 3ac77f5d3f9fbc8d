//! Persist documents and chunk rows; queryable metadata.
//!
//! Backed by SQLite via `sqlx`. Schema is created with a single
//! `CREATE TABLE IF NOT EXISTS` pair run once at construction — there is no
//! migration framework at this scale.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::error::{Result, SecondBrainError};
use crate::types::{Chunk, Document, DocumentSummary, JoinedChunk};

pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn connect(db_path: &str) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", db_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                stored_name TEXT NOT NULL,
                original_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                byte_len INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                doc_id TEXT NOT NULL REFERENCES documents(id),
                chunk_index INTEGER NOT NULL,
                page_start INTEGER,
                page_end INTEGER,
                section TEXT,
                text TEXT NOT NULL,
                text_len INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_created_at ON chunks(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a document and all its chunks inside a single transaction.
    /// On any failure, nothing is persisted — resolves the ingestion-
    /// atomicity open question in favor of an all-or-nothing write.
    pub async fn insert_document_with_chunks(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        if chunks.iter().any(|c| c.doc_id != document.id) {
            return Err(SecondBrainError::InvalidInput(
                "chunk doc_id does not match document id".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (id, stored_name, original_name, mime_type, byte_len, sha256, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.to_string())
        .bind(&document.stored_name)
        .bind(&document.original_name)
        .bind(&document.mime_type)
        .bind(document.byte_len)
        .bind(&document.sha256)
        .bind(document.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (id, doc_id, chunk_index, page_start, page_end, section, text, text_len, sha256, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.doc_id.to_string())
            .bind(chunk.chunk_index)
            .bind(chunk.page_start)
            .bind(chunk.page_end)
            .bind(&chunk.section)
            .bind(&chunk.text)
            .bind(chunk.text_len)
            .bind(&chunk.sha256)
            .bind(chunk.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List documents newest first, with each document's chunk count.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        use sqlx::Row;

        let rows = sqlx::query(
            "SELECT d.id, d.stored_name, d.original_name, d.mime_type, d.byte_len, d.sha256, d.created_at,
                    COUNT(c.id) as chunks_count
             FROM documents d
             LEFT JOIN chunks c ON c.doc_id = d.id
             GROUP BY d.id
             ORDER BY d.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                Ok(DocumentSummary {
                    document: Document {
                        id: parse_uuid(&id)?,
                        stored_name: row.get("stored_name"),
                        original_name: row.get("original_name"),
                        mime_type: row.get("mime_type"),
                        byte_len: row.get("byte_len"),
                        sha256: row.get("sha256"),
                        created_at: row.get("created_at"),
                    },
                    chunks_count: row.get("chunks_count"),
                })
            })
            .collect()
    }

    /// All chunk rows, ordered by `created_at` ascending. This ordering
    /// defines the canonical row positions in both the vector and lexical
    /// indexes.
    pub async fn fetch_chunks_for_index(&self) -> Result<Vec<Chunk>> {
        use sqlx::Row;

        let rows = sqlx::query(
            "SELECT id, doc_id, chunk_index, page_start, page_end, section, text, text_len, sha256, created_at
             FROM chunks
             ORDER BY created_at ASC, chunk_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(chunk_from_row).collect()
    }

    /// Fetch chunks joined with their owning document's names, for a set of
    /// chunk ids. Ids with no matching row are silently dropped.
    pub async fn fetch_chunks_by_ids(&self, ids: &[Uuid]) -> Result<Vec<JoinedChunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT c.id, c.doc_id, c.chunk_index, c.page_start, c.page_end, c.section,
                    c.text, c.text_len, c.sha256, c.created_at,
                    d.original_name, d.stored_name
             FROM chunks c
             JOIN documents d ON d.id = c.doc_id
             WHERE c.id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        use sqlx::Row;
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let original_name: String = row.get("original_name");
                let stored_name: String = row.get("stored_name");
                Ok(JoinedChunk {
                    chunk: chunk_from_row(row)?,
                    original_name,
                    stored_name,
                })
            })
            .collect()
    }
}

/// Every id column is stored as hyphenated TEXT, not the `Uuid` BLOB codec's
/// 16-byte layout, so ids are always read back as `String` and parsed —
/// matching the rest of the pack's own `sqlx` usage.
fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| SecondBrainError::StoreDecode(format!("invalid id {:?}: {}", raw, e)))
}

fn chunk_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Chunk> {
    use sqlx::Row;

    let id: String = row.get("id");
    let doc_id: String = row.get("doc_id");
    Ok(Chunk {
        id: parse_uuid(&id)?,
        doc_id: parse_uuid(&doc_id)?,
        chunk_index: row.get("chunk_index"),
        page_start: row.get("page_start"),
        page_end: row.get("page_end"),
        section: row.get("section"),
        text: row.get("text"),
        text_len: row.get("text_len"),
        sha256: row.get("sha256"),
        created_at: row.get("created_at"),
    })
}
