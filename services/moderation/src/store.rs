//! Status store for video assets
//!
//! The persisted record per video is the only state shared between the
//! foreground ingest path, the background pipeline, and polling clients.
//! The terminal write sets the ingest state and every verdict field in a
//! single UPDATE so a reader can never observe `completed` with a
//! `pending` moderation state.

use crate::error::{ModerationError, ModerationResult};
use crate::models::{
    AssetStatus, IngestState, ModerationState, NewAsset, Verdict, VideoAsset,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Persistence boundary for video asset records
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert a new asset in its initial `uploaded`/`pending` state.
    async fn create(&self, new: &NewAsset) -> ModerationResult<VideoAsset>;

    /// Read a full asset record.
    async fn get(&self, id: Uuid) -> ModerationResult<Option<VideoAsset>>;

    /// Read the status projection polled by clients.
    async fn status(&self, id: Uuid) -> ModerationResult<Option<AssetStatus>>;

    /// Move the ingest state to `processing`.
    async fn mark_processing(&self, id: Uuid) -> ModerationResult<()>;

    /// Terminal write: `completed` plus the full verdict, atomically.
    async fn complete_with_verdict(&self, id: Uuid, verdict: &Verdict) -> ModerationResult<()>;

    /// Move the ingest state to `failed` after an unrecoverable
    /// storage/persistence error.
    async fn mark_failed(&self, id: Uuid, reason: &str) -> ModerationResult<()>;

    /// List assets visible to viewers (safe or under review).
    async fn list_visible(&self) -> ModerationResult<Vec<VideoAsset>>;

    /// List every asset, newest first.
    async fn list_all(&self) -> ModerationResult<Vec<VideoAsset>>;
}

const ASSET_COLUMNS: &str = "id, storage_ref, duration_seconds, original_name, format, \
     ingest_state, moderation_state, moderation_score, moderation_reason, \
     detected_labels, visible, created_at, updated_at";

/// PostgreSQL-backed status store
#[derive(Clone)]
pub struct PgAssetStore {
    pool: PgPool,
}

impl PgAssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_error(message: String) -> ModerationError {
    ModerationError::Persistence(sqlx::Error::Decode(message.into()))
}

fn map_asset_row(row: &PgRow) -> ModerationResult<VideoAsset> {
    let ingest_state: String = row.get("ingest_state");
    let moderation_state: String = row.get("moderation_state");

    Ok(VideoAsset {
        id: row.get("id"),
        storage_ref: row.get("storage_ref"),
        duration_seconds: row.get("duration_seconds"),
        original_name: row.get("original_name"),
        format: row.get("format"),
        ingest_state: IngestState::parse(&ingest_state).map_err(decode_error)?,
        moderation_state: ModerationState::parse(&moderation_state).map_err(decode_error)?,
        moderation_score: row.get("moderation_score"),
        moderation_reason: row.get("moderation_reason"),
        detected_labels: row.get("detected_labels"),
        visible: row.get("visible"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl StatusStore for PgAssetStore {
    async fn create(&self, new: &NewAsset) -> ModerationResult<VideoAsset> {
        let now = Utc::now();
        let asset = VideoAsset {
            id: Uuid::new_v4(),
            storage_ref: new.storage_ref.clone(),
            duration_seconds: new.duration_seconds.unwrap_or(0.0).max(0.0),
            original_name: new.original_name.clone(),
            format: new.format.clone(),
            ingest_state: IngestState::Uploaded,
            moderation_state: ModerationState::Pending,
            moderation_score: 0.0,
            moderation_reason: String::new(),
            detected_labels: Vec::new(),
            visible: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO video_assets (id, storage_ref, duration_seconds, original_name, format, \
             ingest_state, moderation_state, moderation_score, moderation_reason, \
             detected_labels, visible, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(asset.id)
        .bind(&asset.storage_ref)
        .bind(asset.duration_seconds)
        .bind(&asset.original_name)
        .bind(&asset.format)
        .bind(asset.ingest_state.as_str())
        .bind(asset.moderation_state.as_str())
        .bind(asset.moderation_score)
        .bind(&asset.moderation_reason)
        .bind(&asset.detected_labels)
        .bind(asset.visible)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(asset)
    }

    async fn get(&self, id: Uuid) -> ModerationResult<Option<VideoAsset>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM video_assets WHERE id = $1",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_asset_row).transpose()
    }

    async fn status(&self, id: Uuid) -> ModerationResult<Option<AssetStatus>> {
        let row = sqlx::query(
            "SELECT ingest_state, moderation_state, moderation_reason
             FROM video_assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let ingest_state: String = row.get("ingest_state");
                let moderation_state: String = row.get("moderation_state");

                Ok(Some(AssetStatus {
                    ingest_state: IngestState::parse(&ingest_state).map_err(decode_error)?,
                    moderation_state: ModerationState::parse(&moderation_state)
                        .map_err(decode_error)?,
                    moderation_reason: row.get("moderation_reason"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn mark_processing(&self, id: Uuid) -> ModerationResult<()> {
        let result = sqlx::query(
            "UPDATE video_assets SET ingest_state = 'processing', updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ModerationError::Persistence(sqlx::Error::RowNotFound));
        }

        Ok(())
    }

    async fn complete_with_verdict(&self, id: Uuid, verdict: &Verdict) -> ModerationResult<()> {
        let result = sqlx::query(
            "UPDATE video_assets SET
             ingest_state = 'completed',
             moderation_state = $2,
             moderation_score = $3,
             moderation_reason = $4,
             detected_labels = $5,
             visible = $6,
             updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(verdict.status.as_str())
        .bind(verdict.score)
        .bind(&verdict.reason)
        .bind(&verdict.labels)
        .bind(verdict.status.visible())
        .execute(&self.pool)
        .await?;

        // A vanished row must not pass for a successful terminal write.
        if result.rows_affected() == 0 {
            return Err(ModerationError::Persistence(sqlx::Error::RowNotFound));
        }

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> ModerationResult<()> {
        let result = sqlx::query(
            "UPDATE video_assets SET ingest_state = 'failed', moderation_reason = $2, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ModerationError::Persistence(sqlx::Error::RowNotFound));
        }

        Ok(())
    }

    async fn list_visible(&self) -> ModerationResult<Vec<VideoAsset>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM video_assets
             WHERE visible = TRUE AND moderation_state IN ('safe', 'review')
             ORDER BY created_at DESC",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_asset_row).collect()
    }

    async fn list_all(&self) -> ModerationResult<Vec<VideoAsset>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM video_assets ORDER BY created_at DESC",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_asset_row).collect()
    }
}
