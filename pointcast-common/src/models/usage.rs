// File: pointcast-common/src/models/usage.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Subscription plan level; determines the usage ceilings below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Premium,
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Pro => write!(f, "pro"),
            PlanTier::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "premium" => Ok(PlanTier::Premium),
            _ => Err(format!("Unknown plan tier: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_alerts: i64,
    /// TTS character budget per billing month.
    pub max_tts_chars: i64,
    pub max_storage_bytes: i64,
    /// Ceiling for a single uploaded file.
    pub max_file_bytes: i64,
}

const MIB: i64 = 1024 * 1024;

impl PlanTier {
    pub fn limits(&self) -> TierLimits {
        match self {
            PlanTier::Free => TierLimits {
                max_alerts: 3,
                max_tts_chars: 1_000,
                max_storage_bytes: 50 * MIB,
                max_file_bytes: 10 * MIB,
            },
            PlanTier::Pro => TierLimits {
                max_alerts: 10,
                max_tts_chars: 10_000,
                max_storage_bytes: 500 * MIB,
                max_file_bytes: 50 * MIB,
            },
            PlanTier::Premium => TierLimits {
                max_alerts: 50,
                max_tts_chars: 100_000,
                max_storage_bytes: 2048 * MIB,
                max_file_bytes: 100 * MIB,
            },
        }
    }
}

/// First day of the billing month containing `now`.
pub fn month_anchor(now: DateTime<Utc>) -> NaiveDate {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .expect("first of month is always a valid date")
}

/// Per-streamer monthly counters. Counters only move through the
/// accounting operations and are clamped at zero; the whole record is
/// lazily reset when the wall-clock month no longer matches
/// `month_anchor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounters {
    pub streamer_id: String,
    pub alerts_count: i64,
    pub tts_chars: i64,
    pub storage_bytes: i64,
    pub bandwidth_bytes: i64,
    pub month_anchor: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl UsageCounters {
    pub fn fresh(streamer_id: &str, anchor: NaiveDate) -> Self {
        Self {
            streamer_id: streamer_id.to_string(),
            alerts_count: 0,
            tts_chars: 0,
            storage_bytes: 0,
            bandwidth_bytes: 0,
            month_anchor: anchor,
            updated_at: Utc::now(),
        }
    }

    pub fn month_rolled(&self, now: DateTime<Utc>) -> bool {
        self.month_anchor != month_anchor(now)
    }

    /// Zeroes every counter and re-anchors to the given month.
    pub fn reset(&mut self, anchor: NaiveDate) {
        self.alerts_count = 0;
        self.tts_chars = 0;
        self.storage_bytes = 0;
        self.bandwidth_bytes = 0;
        self.month_anchor = anchor;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_anchor_is_first_of_month() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        assert_eq!(
            month_anchor(now),
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
        );
    }

    #[test]
    fn rollover_is_detected_across_months_and_years() {
        let mut c = UsageCounters::fresh("42", NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert!(!c.month_rolled(Utc.with_ymd_and_hms(2026, 8, 31, 23, 59, 59).unwrap()));
        assert!(c.month_rolled(Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 1).unwrap()));

        c.month_anchor = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        assert!(c.month_rolled(Utc.with_ymd_and_hms(2027, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn tier_limits_are_ordered() {
        let free = PlanTier::Free.limits();
        let pro = PlanTier::Pro.limits();
        let premium = PlanTier::Premium.limits();
        assert!(free.max_alerts < pro.max_alerts && pro.max_alerts < premium.max_alerts);
        assert!(free.max_tts_chars < pro.max_tts_chars && pro.max_tts_chars < premium.max_tts_chars);
        assert!(free.max_storage_bytes < pro.max_storage_bytes);
    }
}
