// File: pointcast-core/src/repositories/postgres/usage.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::Error;
use pointcast_common::models::UsageCounters;
use pointcast_common::traits::repository_traits::UsageRepository;

#[derive(Clone)]
pub struct PostgresUsageRepository {
    pool: Pool<Postgres>,
}

impl PostgresUsageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn get_counters(&self, streamer_id: &str) -> Result<Option<UsageCounters>, Error> {
        let row = sqlx::query(
            r#"
            SELECT streamer_id,
                   alerts_count,
                   tts_chars,
                   storage_bytes,
                   bandwidth_bytes,
                   month_anchor,
                   updated_at
            FROM usage_counters
            WHERE streamer_id = $1
            "#,
        )
        .bind(streamer_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            Ok(Some(UsageCounters {
                streamer_id: r.try_get("streamer_id")?,
                alerts_count: r.try_get("alerts_count")?,
                tts_chars: r.try_get("tts_chars")?,
                storage_bytes: r.try_get("storage_bytes")?,
                bandwidth_bytes: r.try_get("bandwidth_bytes")?,
                month_anchor: r.try_get::<NaiveDate, _>("month_anchor")?,
                updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn put_counters(&self, counters: &UsageCounters) -> Result<(), Error> {
        // GREATEST() keeps a racing decrement from ever persisting a
        // negative counter, matching the in-memory clamp.
        sqlx::query(
            r#"
            INSERT INTO usage_counters (
                streamer_id,
                alerts_count,
                tts_chars,
                storage_bytes,
                bandwidth_bytes,
                month_anchor,
                updated_at
            )
            VALUES ($1, GREATEST($2, 0), GREATEST($3, 0), GREATEST($4, 0), GREATEST($5, 0), $6, $7)
            ON CONFLICT (streamer_id) DO UPDATE
               SET alerts_count    = GREATEST(EXCLUDED.alerts_count, 0),
                   tts_chars       = GREATEST(EXCLUDED.tts_chars, 0),
                   storage_bytes   = GREATEST(EXCLUDED.storage_bytes, 0),
                   bandwidth_bytes = GREATEST(EXCLUDED.bandwidth_bytes, 0),
                   month_anchor    = EXCLUDED.month_anchor,
                   updated_at      = EXCLUDED.updated_at
            "#,
        )
        .bind(&counters.streamer_id)
        .bind(counters.alerts_count)
        .bind(counters.tts_chars)
        .bind(counters.storage_bytes)
        .bind(counters.bandwidth_bytes)
        .bind(counters.month_anchor)
        .bind(counters.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
