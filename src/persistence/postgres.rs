//! PostgreSQL implementation of the checkpoint store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::CheckpointRow;
use super::{CheckpointStore, describe};
use crate::config::SyncConfig;
use crate::domain::{Checkpoint, Watermark};
use crate::error::SyncError;

/// PostgreSQL-backed checkpoint store using `sqlx::PgPool`.
///
/// A save is a single guarded statement (`INSERT .. ON CONFLICT DO UPDATE
/// .. WHERE` for the first save, `UPDATE .. WHERE` afterwards): the row is
/// only replaced when its stored watermark still matches the one the run
/// started from, so a stale run can never move it backward.
#[derive(Debug, Clone)]
pub struct PostgresCheckpointStore {
    pool: PgPool,
}

impl PostgresCheckpointStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError::Persistence`] if the connection or a
    /// migration fails.
    pub async fn connect(config: &SyncConfig) -> Result<Self, SyncError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| SyncError::Persistence(e.to_string()))?;

        tracing::info!("checkpoint store connected");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CheckpointStore for PostgresCheckpointStore {
    async fn load(&self, username: &str) -> Result<Option<Checkpoint>, SyncError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            "SELECT username, last_match_id, last_finish_time, rating, games_played, games_won, \
             current_streak, best_rating, updated_at \
             FROM sync_checkpoints WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Checkpoint::try_from).transpose()
    }

    async fn save(
        &self,
        checkpoint: &Checkpoint,
        expected: Option<&Watermark>,
    ) -> Result<(), SyncError> {
        let row = CheckpointRow::try_from(checkpoint)?;

        let result = match expected {
            // First save, or the stored record has no watermark yet.
            None => {
                sqlx::query(
                    "INSERT INTO sync_checkpoints (username, last_match_id, last_finish_time, \
                     rating, games_played, games_won, current_streak, best_rating, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                     ON CONFLICT (username) DO UPDATE SET \
                     last_match_id = EXCLUDED.last_match_id, \
                     last_finish_time = EXCLUDED.last_finish_time, \
                     rating = EXCLUDED.rating, \
                     games_played = EXCLUDED.games_played, \
                     games_won = EXCLUDED.games_won, \
                     current_streak = EXCLUDED.current_streak, \
                     best_rating = EXCLUDED.best_rating, \
                     updated_at = EXCLUDED.updated_at \
                     WHERE sync_checkpoints.last_match_id IS NULL \
                     AND sync_checkpoints.last_finish_time IS NULL",
                )
                .bind(&row.username)
                .bind(row.last_match_id)
                .bind(row.last_finish_time)
                .bind(row.rating)
                .bind(row.games_played)
                .bind(row.games_won)
                .bind(row.current_streak)
                .bind(row.best_rating)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?
            }
            Some(wm) => {
                sqlx::query(
                    "UPDATE sync_checkpoints SET last_match_id = $2, last_finish_time = $3, \
                     rating = $4, games_played = $5, games_won = $6, current_streak = $7, \
                     best_rating = $8, updated_at = $9 \
                     WHERE username = $1 AND last_match_id = $10 AND last_finish_time = $11",
                )
                .bind(&row.username)
                .bind(row.last_match_id)
                .bind(row.last_finish_time)
                .bind(row.rating)
                .bind(row.games_played)
                .bind(row.games_won)
                .bind(row.current_streak)
                .bind(row.best_rating)
                .bind(Utc::now())
                .bind(wm.match_id.get())
                .bind(wm.finish_time)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing written: either the row exists with another watermark or
        // we expected a row that is not there.
        let stored = self.load(&checkpoint.username).await?;
        Err(SyncError::CheckpointConflict {
            username: checkpoint.username.clone(),
            detail: format!(
                "expected watermark {}, found {}",
                describe(expected),
                stored.map_or_else(
                    || "no checkpoint".to_string(),
                    |cp| describe(cp.watermark.as_ref())
                )
            ),
        })
    }

    async fn reset(&self, username: &str) -> Result<bool, SyncError> {
        let result = sqlx::query("DELETE FROM sync_checkpoints WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
