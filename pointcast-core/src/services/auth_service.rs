// File: pointcast-core/src/services/auth_service.rs

use std::sync::Arc;

use tracing::info;

use crate::platforms::twitch::OAuthClient;
use crate::services::listener_manager::ListenerManager;
use crate::services::token_service::TokenService;
use crate::Error;
use pointcast_common::models::StreamerAccount;
use pointcast_common::traits::repository_traits::AccountRepository;

/// Completes the OAuth login: exchanges the authorization code, stores
/// the credential, makes sure the account exists, and brings up the
/// redemption listener for the new streamer.
pub struct AuthService {
    oauth: Arc<dyn OAuthClient>,
    tokens: Arc<TokenService>,
    accounts: Arc<dyn AccountRepository>,
    listeners: Arc<ListenerManager>,
}

impl AuthService {
    pub fn new(
        oauth: Arc<dyn OAuthClient>,
        tokens: Arc<TokenService>,
        accounts: Arc<dyn AccountRepository>,
        listeners: Arc<ListenerManager>,
    ) -> Self {
        Self {
            oauth,
            tokens,
            accounts,
            listeners,
        }
    }

    pub async fn complete_login(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<StreamerAccount, Error> {
        let grant = self.oauth.exchange_code(code, redirect_uri).await?;
        let validated = self.oauth.validate(&grant.access_token).await?;

        self.tokens.store_grant(&validated.user_id, grant).await?;

        let account = match self.accounts.get_account(&validated.user_id).await? {
            Some(existing) => existing,
            None => {
                let account = StreamerAccount::new(&validated.user_id, &validated.login);
                self.accounts.upsert_account(&account).await?;
                account
            }
        };

        self.listeners.start_listener(&validated.user_id);
        info!(streamer_id = %validated.user_id, login = %validated.login, "login completed");
        Ok(account)
    }
}
