// File: pointcast-core/src/platforms/twitch/auth.rs
//
// Raw OAuth plumbing against the Twitch id endpoints: authorization-code
// exchange, refresh-token grant, and token validation (which is also how
// we learn the broadcaster user id behind a token).

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::Error;

pub const TWITCH_AUTHORIZE_URL: &str = "https://id.twitch.tv/oauth2/authorize";
pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const TWITCH_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";

/// Scopes the redemption pipeline needs.
pub const REQUIRED_SCOPES: &[&str] = &["channel:read:redemptions"];

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatedToken {
    pub user_id: String,
    pub login: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[async_trait]
pub trait OAuthClient: Send + Sync {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, Error>;
    /// Single attempt; callers decide whether `AuthExpired` means
    /// "ask the streamer to reconnect".
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, Error>;
    async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error>;
}

pub struct TwitchOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl TwitchOAuthClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Consent-page URL for the login redirect.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = Url::parse(TWITCH_AUTHORIZE_URL).expect("authorize url is valid");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &REQUIRED_SCOPES.join(" "))
            .append_pair("state", state);
        url.to_string()
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, Error> {
        let resp = self
            .http
            .post(TWITCH_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("token endpoint unreachable: {e}")))?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::AuthExpired(format!(
                "token endpoint rejected the grant (HTTP {status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::Transient(format!(
                "token endpoint returned HTTP {status}"
            )));
        }

        Ok(resp.json::<TokenGrant>().await?)
    }
}

#[async_trait]
impl OAuthClient for TwitchOAuthClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, Error> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, Error> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error> {
        let resp = self
            .http
            .get(TWITCH_VALIDATE_URL)
            .header("Authorization", format!("OAuth {access_token}"))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("validate endpoint unreachable: {e}")))?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(Error::AuthExpired(format!(
                "token failed validation (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(Error::Transient(format!(
                "validate endpoint returned HTTP {status}"
            )));
        }

        Ok(resp.json::<ValidatedToken>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_scope_and_state() {
        let client = TwitchOAuthClient::new("cid".into(), "secret".into());
        let url = client.authorize_url("https://app.example.com/auth/twitch/callback", "xyz");
        assert!(url.starts_with(TWITCH_AUTHORIZE_URL));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("channel%3Aread%3Aredemptions"));
        assert!(url.contains("state=xyz"));
    }
}
