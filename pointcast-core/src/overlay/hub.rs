// File: pointcast-core/src/overlay/hub.rs
//
// In-process publish/subscribe keyed by streamer id. The redemption
// listener publishes playback commands into a streamer's room; every
// overlay client that joined the room gets its own copy. Delivery is
// fire-and-forget: an empty room just means nobody is watching.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use pointcast_common::models::PlaybackCommand;

/// Room naming matches the wire contract (`join-overlay` puts a client
/// in `overlay-{streamerId}`).
pub fn room_name(streamer_id: &str) -> String {
    format!("overlay-{streamer_id}")
}

pub struct OverlayHub {
    rooms: DashMap<String, Vec<mpsc::UnboundedSender<PlaybackCommand>>>,
}

impl OverlayHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Joins the streamer's room and returns the subscriber's receiver.
    /// The subscription ends when the receiver is dropped.
    pub fn join(&self, streamer_id: &str) -> mpsc::UnboundedReceiver<PlaybackCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.rooms.entry(room_name(streamer_id)).or_default().push(tx);
        debug!(streamer_id, "overlay joined room");
        rx
    }

    /// Publishes to every live subscriber of the streamer's room,
    /// pruning subscribers that have disconnected. Returns the number
    /// of overlays the command reached.
    pub fn publish(&self, streamer_id: &str, command: PlaybackCommand) -> usize {
        let room = room_name(streamer_id);
        let Some(mut senders) = self.rooms.get_mut(&room) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        let mut delivered = 0;
        for tx in senders.iter() {
            if tx.send(command.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, streamer_id: &str) -> usize {
        self.rooms
            .get(&room_name(streamer_id))
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for OverlayHub {
    fn default() -> Self {
        Self::new()
    }
}
