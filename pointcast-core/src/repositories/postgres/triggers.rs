// File: pointcast-core/src/repositories/postgres/triggers.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::Error;
use pointcast_common::models::RewardTrigger;
use pointcast_common::traits::repository_traits::TriggerRepository;

#[derive(Clone)]
pub struct PostgresTriggerRepository {
    pool: Pool<Postgres>,
}

impl PostgresTriggerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_trigger(r: sqlx::postgres::PgRow) -> Result<RewardTrigger, Error> {
    let media: serde_json::Value = r.try_get("media")?;
    let tts: Option<serde_json::Value> = r.try_get("tts_config")?;
    Ok(RewardTrigger {
        trigger_id: r.try_get::<Uuid, _>("trigger_id")?,
        streamer_id: r.try_get("streamer_id")?,
        reward_id: r.try_get("reward_id")?,
        media: serde_json::from_value(media)?,
        volume: r.try_get::<f32, _>("volume")?,
        tts: tts.map(serde_json::from_value).transpose()?,
        reward_requires_input: r.try_get("reward_requires_input")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

const TRIGGER_COLUMNS: &str = r#"
    trigger_id,
    streamer_id,
    reward_id,
    volume,
    media,
    tts_config,
    reward_requires_input,
    created_at,
    updated_at
"#;

#[async_trait]
impl TriggerRepository for PostgresTriggerRepository {
    async fn upsert_trigger(&self, trigger: &RewardTrigger) -> Result<(), Error> {
        let media = serde_json::to_value(&trigger.media)?;
        let tts = trigger.tts.as_ref().map(serde_json::to_value).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO reward_triggers (
                trigger_id,
                streamer_id,
                reward_id,
                volume,
                media,
                tts_config,
                reward_requires_input,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (streamer_id, reward_id) DO UPDATE
               SET volume                = EXCLUDED.volume,
                   media                 = EXCLUDED.media,
                   tts_config            = EXCLUDED.tts_config,
                   reward_requires_input = EXCLUDED.reward_requires_input,
                   updated_at            = EXCLUDED.updated_at
            "#,
        )
        .bind(trigger.trigger_id)
        .bind(&trigger.streamer_id)
        .bind(&trigger.reward_id)
        .bind(trigger.volume)
        .bind(media)
        .bind(tts)
        .bind(trigger.reward_requires_input)
        .bind(trigger.created_at)
        .bind(trigger.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {TRIGGER_COLUMNS} FROM reward_triggers \
             WHERE streamer_id = $1 AND reward_id = $2"
        ))
        .bind(streamer_id)
        .bind(reward_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_trigger).transpose()
    }

    async fn list_triggers(&self, streamer_id: &str) -> Result<Vec<RewardTrigger>, Error> {
        let rows = sqlx::query(&format!(
            "SELECT {TRIGGER_COLUMNS} FROM reward_triggers \
             WHERE streamer_id = $1 ORDER BY created_at"
        ))
        .bind(streamer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_trigger).collect()
    }

    async fn delete_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error> {
        let row = sqlx::query(&format!(
            "DELETE FROM reward_triggers \
             WHERE streamer_id = $1 AND reward_id = $2 \
             RETURNING {TRIGGER_COLUMNS}"
        ))
        .bind(streamer_id)
        .bind(reward_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_trigger).transpose()
    }
}
