//! Speak event broadcasting for the Chatter server.
//!
//! [`EventBroadcaster`] wraps a tokio broadcast channel so that every
//! WebSocket connection receives every speak event, regardless of whether it
//! arrived over HTTP or from another WebSocket client.
//!
//! # Example
//!
//! ```rust
//! use chatter_server::broadcast::EventBroadcaster;
//! use chatter_server::types::{Emotion, SpeakEvent};
//!
//! let broadcaster = EventBroadcaster::new();
//! let mut rx = broadcaster.subscribe();
//!
//! broadcaster.broadcast(SpeakEvent::new("こんにちは", Emotion::Happy));
//! assert_eq!(rx.try_recv().unwrap().text, "こんにちは");
//! ```

use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, trace};

use crate::types::SpeakEvent;

/// Default channel capacity.
///
/// Subscribers that fall more than this many events behind receive
/// `RecvError::Lagged` and skip ahead.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out hub for speak events.
///
/// `Clone`, `Send` and `Sync`; clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: Sender<SpeakEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a broadcaster with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        debug!(capacity, "Created event broadcaster");
        Self { sender }
    }

    /// Subscribes to events broadcast from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<SpeakEvent> {
        let rx = self.sender.subscribe();
        debug!(
            subscriber_count = self.subscriber_count(),
            "New subscriber added"
        );
        rx
    }

    /// Sends `event` to all current subscribers and returns how many there
    /// were. Never blocks.
    pub fn broadcast(&self, event: SpeakEvent) -> usize {
        trace!(emotion = %event.emotion, "Broadcasting speak event");

        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                // No connected clients; the event is simply dropped
                debug!("No active subscribers to receive event");
                0
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
