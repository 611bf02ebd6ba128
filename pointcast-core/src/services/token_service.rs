// File: pointcast-core/src/services/token_service.rs

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::platforms::twitch::{OAuthClient, TokenGrant};
use crate::Error;
use pointcast_common::models::StreamerCredential;
use pointcast_common::traits::repository_traits::CredentialsRepository;

/// Tokens within this many seconds of expiry are treated as expired.
pub const TOKEN_SAFETY_WINDOW_SECS: i64 = 60;

/// Hands out currently-valid access tokens, refreshing through the
/// upstream OAuth endpoint when the stored one is inside the safety
/// window. One refresh attempt per invocation, never more.
pub struct TokenService {
    credentials_repo: Arc<dyn CredentialsRepository>,
    oauth: Arc<dyn OAuthClient>,
}

impl TokenService {
    pub fn new(
        credentials_repo: Arc<dyn CredentialsRepository>,
        oauth: Arc<dyn OAuthClient>,
    ) -> Self {
        Self {
            credentials_repo,
            oauth,
        }
    }

    /// Returns a valid access token for the streamer.
    ///
    /// * No stored credential -> `NotFound`.
    /// * Token still valid -> returned unchanged, no network call.
    /// * Expired -> one refresh-grant attempt; the rotated tokens are
    ///   persisted before the new access token is returned.
    /// * Refresh rejected (revoked grant) -> `AuthExpired`; callers
    ///   surface this as "reconnect your account".
    pub async fn get_valid_access_token(&self, streamer_id: &str) -> Result<String, Error> {
        let cred = self
            .credentials_repo
            .get_credential(streamer_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no credential for streamer {streamer_id}")))?;

        if cred.is_valid_at(Utc::now(), TOKEN_SAFETY_WINDOW_SECS) {
            return Ok(cred.access_token);
        }

        warn!(streamer_id, "access token inside safety window; refreshing");
        let grant = self.oauth.refresh(&cred.refresh_token).await?;
        let updated = self.persist_grant(cred, grant).await?;
        debug!(
            streamer_id,
            expires_in = updated.expires_in,
            "access token refreshed"
        );
        Ok(updated.access_token)
    }

    /// Records a fresh grant for a streamer, creating the credential on
    /// first login and overwriting it in place afterwards. Used by both
    /// the refresh path above and the listener's own rotation.
    pub async fn store_grant(
        &self,
        streamer_id: &str,
        grant: TokenGrant,
    ) -> Result<StreamerCredential, Error> {
        let existing = self.credentials_repo.get_credential(streamer_id).await?;
        let cred = match existing {
            Some(cred) => self.persist_grant(cred, grant).await?,
            None => {
                let now = Utc::now();
                let cred = StreamerCredential {
                    streamer_id: streamer_id.to_string(),
                    access_token: grant.access_token,
                    refresh_token: grant.refresh_token,
                    expires_in: grant.expires_in,
                    issued_at: now,
                    scopes: grant.scope,
                    created_at: now,
                    updated_at: now,
                };
                self.credentials_repo.store_credential(&cred).await?;
                cred
            }
        };
        Ok(cred)
    }

    async fn persist_grant(
        &self,
        mut cred: StreamerCredential,
        grant: TokenGrant,
    ) -> Result<StreamerCredential, Error> {
        let now = Utc::now();
        cred.access_token = grant.access_token;
        cred.refresh_token = grant.refresh_token;
        cred.expires_in = grant.expires_in;
        cred.issued_at = now;
        if !grant.scope.is_empty() {
            cred.scopes = grant.scope;
        }
        cred.updated_at = now;
        self.credentials_repo.store_credential(&cred).await?;
        Ok(cred)
    }
}
