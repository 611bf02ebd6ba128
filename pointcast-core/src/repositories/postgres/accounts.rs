// File: pointcast-core/src/repositories/postgres/accounts.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use std::str::FromStr;

use crate::Error;
use pointcast_common::models::{PlanTier, StreamerAccount};
use pointcast_common::traits::repository_traits::AccountRepository;

#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn upsert_account(&self, account: &StreamerAccount) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO streamer_accounts (
                streamer_id,
                display_name,
                plan,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (streamer_id) DO UPDATE
               SET display_name = EXCLUDED.display_name,
                   plan         = EXCLUDED.plan,
                   updated_at   = EXCLUDED.updated_at
            "#,
        )
        .bind(&account.streamer_id)
        .bind(&account.display_name)
        .bind(account.plan.to_string())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_account(&self, streamer_id: &str) -> Result<Option<StreamerAccount>, Error> {
        let row = sqlx::query(
            r#"
            SELECT streamer_id, display_name, plan, created_at, updated_at
            FROM streamer_accounts
            WHERE streamer_id = $1
            "#,
        )
        .bind(streamer_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            Ok(Some(StreamerAccount {
                streamer_id: r.try_get("streamer_id")?,
                display_name: r.try_get("display_name")?,
                plan: PlanTier::from_str(&r.try_get::<String, _>("plan")?)
                    .map_err(Error::Parse)?,
                created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
                updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
            }))
        } else {
            Ok(None)
        }
    }
}
