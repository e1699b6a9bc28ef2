//! Canvas Store
//!
//! This module defines the persistence boundary for canvases and provides a
//! SQLite implementation. Canvases are stored as JSON with the parent canvas
//! ID indexed so derived children can be found without loading every row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::document::Canvas;
use crate::error::{Error, Result};

/// Metadata for a document uploaded alongside a canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Document ID
    pub id: Uuid,
    /// Owning canvas
    pub canvas_id: Uuid,
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// Size in bytes
    pub size_bytes: i64,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentMeta {
    /// Create metadata for a new upload
    #[must_use]
    pub fn new(
        canvas_id: Uuid,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas_id,
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes,
            uploaded_at: Utc::now(),
        }
    }
}

/// Summary of a canvas for listing
#[derive(Debug, Clone)]
pub struct CanvasSummary {
    /// Canvas ID
    pub id: Uuid,
    /// Canvas name
    pub name: String,
    /// Last modification
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator for canvases
#[async_trait]
pub trait CanvasRepository: Send + Sync {
    /// Insert or replace a canvas
    async fn save(&self, canvas: &Canvas) -> Result<()>;

    /// Load a canvas, failing with `CanvasNotFound` when absent
    async fn load(&self, canvas_id: Uuid) -> Result<Canvas>;

    /// Delete a canvas. Returns whether it existed. Links pointing at it are left dangling.
    async fn delete(&self, canvas_id: Uuid) -> Result<bool>;

    /// Uploaded-document metadata for a canvas
    async fn list_documents(&self, canvas_id: Uuid) -> Result<Vec<DocumentMeta>>;

    /// Record uploaded-document metadata
    async fn add_document(&self, document: &DocumentMeta) -> Result<()>;

    /// Canvases whose parent link points at `parent_canvas_id`
    async fn list_children(&self, parent_canvas_id: Uuid) -> Result<Vec<CanvasSummary>>;
}

/// SQLite-based canvas store
pub struct SqliteCanvasStore {
    pool: SqlitePool,
}

impl SqliteCanvasStore {
    /// Create a new store with the given database pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS canvases (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                parent_canvas_id TEXT,
                canvas_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_canvases_parent ON canvases(parent_canvas_id);

            CREATE TABLE IF NOT EXISTS canvas_documents (
                id TEXT PRIMARY KEY,
                canvas_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                uploaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_canvas ON canvas_documents(canvas_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List all canvases, most recently modified first
    pub async fn list_canvases(&self) -> Result<Vec<CanvasSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, updated_at FROM canvases ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("bad uuid '{}': {}", s, e)))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("bad timestamp '{}': {}", s, e)))
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CanvasSummary> {
    let id: String = row.get("id");
    let name: String = row.get("name");
    let updated_at: String = row.get("updated_at");
    Ok(CanvasSummary {
        id: parse_uuid(&id)?,
        name,
        updated_at: parse_time(&updated_at)?,
    })
}

#[async_trait]
impl CanvasRepository for SqliteCanvasStore {
    async fn save(&self, canvas: &Canvas) -> Result<()> {
        let canvas_json = serde_json::to_string(canvas)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO canvases
            (id, name, parent_canvas_id, canvas_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(canvas.id.to_string())
        .bind(&canvas.name)
        .bind(canvas.parent_link.as_ref().map(|l| l.parent_canvas_id.to_string()))
        .bind(&canvas_json)
        .bind(canvas.created_at.to_rfc3339())
        .bind(canvas.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(canvas_id = %canvas.id, "Saved canvas");
        Ok(())
    }

    async fn load(&self, canvas_id: Uuid) -> Result<Canvas> {
        let row = sqlx::query(
            r#"
            SELECT canvas_json FROM canvases WHERE id = ?
            "#,
        )
        .bind(canvas_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::CanvasNotFound(canvas_id))?;

        let canvas_json: String = row.get("canvas_json");
        let mut canvas: Canvas = serde_json::from_str(&canvas_json)?;
        canvas.repair_layout();
        Ok(canvas)
    }

    async fn delete(&self, canvas_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM canvases WHERE id = ?
            "#,
        )
        .bind(canvas_id.to_string())
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM canvas_documents WHERE canvas_id = ?
            "#,
        )
        .bind(canvas_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_documents(&self, canvas_id: Uuid) -> Result<Vec<DocumentMeta>> {
        let rows = sqlx::query(
            r#"
            SELECT id, canvas_id, file_name, content_type, size_bytes, uploaded_at
            FROM canvas_documents
            WHERE canvas_id = ?
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(canvas_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let canvas_id: String = row.get("canvas_id");
                let uploaded_at: String = row.get("uploaded_at");
                Ok(DocumentMeta {
                    id: parse_uuid(&id)?,
                    canvas_id: parse_uuid(&canvas_id)?,
                    file_name: row.get("file_name"),
                    content_type: row.get("content_type"),
                    size_bytes: row.get("size_bytes"),
                    uploaded_at: parse_time(&uploaded_at)?,
                })
            })
            .collect()
    }

    async fn add_document(&self, document: &DocumentMeta) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO canvas_documents
            (id, canvas_id, file_name, content_type, size_bytes, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(document.canvas_id.to_string())
        .bind(&document.file_name)
        .bind(&document.content_type)
        .bind(document.size_bytes)
        .bind(document.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_children(&self, parent_canvas_id: Uuid) -> Result<Vec<CanvasSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, updated_at FROM canvases
            WHERE parent_canvas_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(parent_canvas_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}
