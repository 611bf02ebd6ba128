// File: pointcast-core/src/platforms/mod.rs

use async_trait::async_trait;

use crate::Error;
use pointcast_common::models::RedemptionEvent;

/// Sink for redemption events coming off a listener's event stream.
#[async_trait]
pub trait RedemptionHandler: Send + Sync {
    async fn handle_redemption(&self, event: RedemptionEvent) -> Result<(), Error>;
}

pub mod twitch;
pub mod twitch_eventsub;
