// File: pointcast-common/src/models/credential.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens for one streamer on the upstream platform.
///
/// One row per streamer, keyed by the opaque platform user id. Created on
/// a successful authorization-code exchange, overwritten in place on every
/// refresh or re-auth, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerCredential {
    pub streamer_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds, as reported by the token endpoint.
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreamerCredential {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in)
    }

    /// True while `issued_at + expires_in > now + margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        self.expires_at() > now + Duration::seconds(margin_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(issued_at: DateTime<Utc>, expires_in: i64) -> StreamerCredential {
        StreamerCredential {
            streamer_id: "123".into(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_in,
            issued_at,
            scopes: vec!["channel:read:redemptions".into()],
            created_at: issued_at,
            updated_at: issued_at,
        }
    }

    #[test]
    fn valid_while_outside_safety_window() {
        let now = Utc::now();
        let c = cred(now, 3600);
        assert!(c.is_valid_at(now, 60));
        assert!(c.is_valid_at(now + Duration::seconds(3539), 60));
    }

    #[test]
    fn invalid_once_inside_safety_window() {
        let now = Utc::now();
        let c = cred(now, 3600);
        assert!(!c.is_valid_at(now + Duration::seconds(3540), 60));
        assert!(!c.is_valid_at(now + Duration::seconds(4000), 60));
    }
}
