// File: pointcast-common/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::usage::PlanTier;

/// A streamer's account record; owns the plan tier the usage limits
/// are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerAccount {
    pub streamer_id: String,
    pub display_name: String,
    pub plan: PlanTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreamerAccount {
    pub fn new(streamer_id: &str, display_name: &str) -> Self {
        let now = Utc::now();
        Self {
            streamer_id: streamer_id.to_string(),
            display_name: display_name.to_string(),
            plan: PlanTier::Free,
            created_at: now,
            updated_at: now,
        }
    }
}
