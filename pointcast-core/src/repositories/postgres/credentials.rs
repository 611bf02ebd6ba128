// File: pointcast-core/src/repositories/postgres/credentials.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::crypto::TokenCipher;
use crate::Error;
use pointcast_common::models::StreamerCredential;
use pointcast_common::traits::repository_traits::CredentialsRepository;

#[derive(Clone)]
pub struct PostgresCredentialsRepository {
    pool: Pool<Postgres>,
    cipher: TokenCipher,
}

impl PostgresCredentialsRepository {
    pub fn new(pool: Pool<Postgres>, cipher: TokenCipher) -> Self {
        Self { pool, cipher }
    }

    fn row_to_credential(&self, r: sqlx::postgres::PgRow) -> Result<StreamerCredential, Error> {
        let access = self.cipher.decrypt(&r.try_get::<String, _>("access_token")?)?;
        let refresh = self.cipher.decrypt(&r.try_get::<String, _>("refresh_token")?)?;
        let scopes: serde_json::Value = r.try_get("scopes")?;
        Ok(StreamerCredential {
            streamer_id: r.try_get("streamer_id")?,
            access_token: access,
            refresh_token: refresh,
            expires_in: r.try_get("expires_in")?,
            issued_at: r.try_get::<DateTime<Utc>, _>("issued_at")?,
            scopes: serde_json::from_value(scopes)?,
            created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl CredentialsRepository for PostgresCredentialsRepository {
    async fn store_credential(&self, cred: &StreamerCredential) -> Result<(), Error> {
        let encrypted_access = self.cipher.encrypt(&cred.access_token)?;
        let encrypted_refresh = self.cipher.encrypt(&cred.refresh_token)?;
        let scopes = serde_json::to_value(&cred.scopes)?;

        sqlx::query(
            r#"
            INSERT INTO streamer_credentials (
                streamer_id,
                access_token,
                refresh_token,
                expires_in,
                issued_at,
                scopes,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (streamer_id) DO UPDATE
               SET access_token  = EXCLUDED.access_token,
                   refresh_token = EXCLUDED.refresh_token,
                   expires_in    = EXCLUDED.expires_in,
                   issued_at     = EXCLUDED.issued_at,
                   scopes        = EXCLUDED.scopes,
                   updated_at    = EXCLUDED.updated_at
            "#,
        )
        .bind(&cred.streamer_id)
        .bind(encrypted_access)
        .bind(encrypted_refresh)
        .bind(cred.expires_in)
        .bind(cred.issued_at)
        .bind(scopes)
        .bind(cred.created_at)
        .bind(cred.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credential(&self, streamer_id: &str) -> Result<Option<StreamerCredential>, Error> {
        let row = sqlx::query(
            r#"
            SELECT streamer_id,
                   access_token,
                   refresh_token,
                   expires_in,
                   issued_at,
                   scopes,
                   created_at,
                   updated_at
            FROM streamer_credentials
            WHERE streamer_id = $1
            "#,
        )
        .bind(streamer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_credential(r)).transpose()
    }

    async fn list_credentials(&self) -> Result<Vec<StreamerCredential>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT streamer_id,
                   access_token,
                   refresh_token,
                   expires_in,
                   issued_at,
                   scopes,
                   created_at,
                   updated_at
            FROM streamer_credentials
            ORDER BY streamer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| self.row_to_credential(r))
            .collect()
    }
}
