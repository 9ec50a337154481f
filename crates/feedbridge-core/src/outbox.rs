//! Outbound notification queue.
//!
//! Many producers (command handlers, event projectors) feed a single
//! delivery consumer. Producers never wait: a full or closed queue drops the
//! message, bumps a counter and logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::warn;

use crate::ids::UserId;

/// A text message addressed to one end-user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Recipient.
    pub user_id: UserId,
    /// Message text.
    pub text: String,
    /// Ask the transport not to render link previews.
    pub disable_preview: bool,
}

impl Notification {
    /// Plain text message with link previews enabled.
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            disable_preview: false,
        }
    }

    /// Disable link previews for this message.
    #[must_use]
    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }
}

/// Producer handle of the outbound queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of the outbound queue.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<Notification>,
}

impl Outbox {
    /// Create a queue holding at most `capacity` undelivered messages.
    pub fn channel(capacity: usize) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            OutboxReceiver { rx },
        )
    }

    /// Enqueue a notification without waiting.
    ///
    /// Returns `false` if the queue is full or the consumer is gone.
    pub fn send(&self, notification: Notification) -> bool {
        let user_id = notification.user_id;
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                warn!(%user_id, reason, "outbox rejected notification");
                false
            }
        }
    }

    /// Enqueue a plain text message.
    pub fn send_text(&self, user_id: UserId, text: impl Into<String>) -> bool {
        self.send(Notification::text(user_id, text))
    }

    /// Messages dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl OutboxReceiver {
    /// Wait for the next notification. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Take a notification if one is ready.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_in_order() {
        let (outbox, mut rx) = Outbox::channel(8);
        assert!(outbox.send_text(UserId::new(1), "first"));
        assert!(outbox.send_text(UserId::new(2), "second"));

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.user_id, UserId::new(2));
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let (outbox, _rx) = Outbox::channel(1);
        assert!(outbox.send_text(UserId::new(1), "a"));
        assert!(!outbox.send_text(UserId::new(1), "b"));
        assert_eq!(outbox.dropped(), 1);
    }

    #[test]
    fn closed_queue_drops() {
        let (outbox, rx) = Outbox::channel(4);
        drop(rx);
        assert!(!outbox.send_text(UserId::new(1), "a"));
        assert_eq!(outbox.dropped(), 1);
    }

    #[test]
    fn clones_share_drop_counter() {
        let (outbox, _rx) = Outbox::channel(1);
        let other = outbox.clone();
        let _ = outbox.send_text(UserId::new(1), "a");
        let _ = other.send_text(UserId::new(1), "b");
        assert_eq!(outbox.dropped(), 1);
        assert_eq!(other.dropped(), 1);
    }

    #[test]
    fn without_preview_sets_flag() {
        let n = Notification::text(UserId::new(3), "x").without_preview();
        assert!(n.disable_preview);
    }

    #[test]
    fn try_recv_empty_is_none() {
        let (_outbox, mut rx) = Outbox::channel(1);
        assert!(rx.try_recv().is_none());
    }
}
