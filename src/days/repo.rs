//! Persistence boundary for day documents.
//!
//! Days are stored one row per `(user_id, date)` with the whole document in a
//! JSONB column next to a version counter. Writers read a version, mutate the
//! document in memory and hand it back through [`DayStore::update_day`], which
//! only lands while the row is still at that version. Lost updates between
//! concurrent writers surface as [`Error::Conflict`] instead of silently
//! overwriting each other.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};

use super::model::DayRecord;

/// A day document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDay {
    pub day: DayRecord,
    pub version: i64,
}

#[async_trait]
pub trait DayStore: Send + Sync {
    /// Day for `(user_id, date)`, or `None` when absent.
    async fn fetch_day(&self, user_id: Uuid, date: &str) -> Result<Option<StoredDay>>;

    /// Insert a new day at version 1. A day already stored under the same
    /// `(user_id, date)` is [`Error::Conflict`].
    async fn insert_day(&self, day: &DayRecord) -> Result<()>;

    /// Replace the stored document, but only while the row is still at
    /// `expected_version`. A concurrent writer having bumped the version is
    /// [`Error::Conflict`]; a vanished day is [`Error::NotFound`].
    async fn update_day(&self, day: &DayRecord, expected_version: i64) -> Result<()>;

    /// Delete the day. Returns whether a row was removed.
    async fn delete_day(&self, user_id: Uuid, date: &str) -> Result<bool>;

    /// All days of a user, oldest date first.
    async fn list_days(&self, user_id: Uuid) -> Result<Vec<DayRecord>>;
}

/// Postgres-backed [`DayStore`].
#[derive(Clone)]
pub struct PgDayStore {
    pool: PgPool,
}

impl PgDayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// [`connect`](Self::connect) with settings from an [`AppConfig`].
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        Self::connect(&config.database_url, config.max_connections).await
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DayStore for PgDayStore {
    async fn fetch_day(&self, user_id: Uuid, date: &str) -> Result<Option<StoredDay>> {
        let row = sqlx::query(
            r#"
            SELECT doc, version
            FROM days
            WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let Json(day): Json<DayRecord> = row.try_get("doc")?;
                let version: i64 = row.try_get("version")?;
                Ok(Some(StoredDay { day, version }))
            }
            None => Ok(None),
        }
    }

    async fn insert_day(&self, day: &DayRecord) -> Result<()> {
        // DO NOTHING instead of an error lets two racing first-writers be
        // told apart by rows_affected.
        let res = sqlx::query(
            r#"
            INSERT INTO days (id, user_id, date, doc, version)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (user_id, date) DO NOTHING
            "#,
        )
        .bind(day.id)
        .bind(day.user_id)
        .bind(&day.date)
        .bind(Json(day))
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(Error::Conflict);
        }
        Ok(())
    }

    async fn update_day(&self, day: &DayRecord, expected_version: i64) -> Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE days
            SET doc = $1, version = version + 1
            WHERE user_id = $2 AND date = $3 AND version = $4
            "#,
        )
        .bind(Json(day))
        .bind(day.user_id)
        .bind(&day.date)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        // Zero rows: either the day vanished or another writer bumped the
        // version in between.
        match self.fetch_day(day.user_id, &day.date).await? {
            Some(_) => Err(Error::Conflict),
            None => Err(Error::NotFound),
        }
    }

    async fn delete_day(&self, user_id: Uuid, date: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM days
            WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_days(&self, user_id: Uuid) -> Result<Vec<DayRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM days
            WHERE user_id = $1
            ORDER BY date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let Json(day): Json<DayRecord> = row.try_get("doc")?;
                Ok(day)
            })
            .collect()
    }
}
