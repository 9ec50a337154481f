//! Push event routing: filter, deduplicate, project, enqueue.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use feedbridge_backend::Backend;
use feedbridge_backend::wire::{NewCommentEvent, OnePostResponse};
use feedbridge_core::{Outbox, UserId};
use feedbridge_session::{Session, StateStore};
use metrics::counter;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dedup::{DedupCache, DedupKey};
use crate::errors::{RealtimeError, Result};
use crate::events::PushEvent;
use crate::metrics::{EVENTS_FAILED_TOTAL, EVENTS_ROUTED_TOTAL};
use crate::projector;
use crate::supervisor::PushEventHandler;

/// What happened to a routed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A notification was enqueued.
    Delivered,
    /// The event echoes the user's own action.
    SelfAuthored,
    /// Already forwarded to this user.
    Duplicate,
    /// Not an event the bridge acts on.
    Ignored,
    /// Projected but the outbox refused it.
    Dropped,
}

impl RouteOutcome {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::SelfAuthored => "self_authored",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for RouteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns push events into notifications.
pub struct EventRouter {
    store: Arc<dyn StateStore>,
    backend: Arc<dyn Backend>,
    dedup: Arc<DedupCache>,
    outbox: Outbox,
    host: String,
}

impl EventRouter {
    /// Router writing to `outbox`; `host` is used for post permalinks.
    pub fn new(
        store: Arc<dyn StateStore>,
        backend: Arc<dyn Backend>,
        dedup: Arc<DedupCache>,
        outbox: Outbox,
        host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            dedup,
            outbox,
            host: host.into(),
        }
    }

    /// Route one event received on `user_id`'s socket.
    pub async fn route(&self, user_id: UserId, name: &str, data: Value) -> Result<RouteOutcome> {
        match PushEvent::decode(name, data)? {
            PushEvent::NewComment(event) => self.on_comment(user_id, &event).await,
            PushEvent::NewPost(event) => self.on_post(user_id, &event),
            PushEvent::Other(name) => {
                trace!(%user_id, event = %name, "unhandled push event");
                Ok(RouteOutcome::Ignored)
            }
        }
    }

    fn authorized_session(&self, user_id: UserId) -> Result<Session> {
        let session = self.store.load(user_id)?;
        if session.is_authorized() {
            Ok(session)
        } else {
            Err(RealtimeError::StaleState(user_id))
        }
    }

    async fn on_comment(&self, user_id: UserId, event: &NewCommentEvent) -> Result<RouteOutcome> {
        let session = self.authorized_session(user_id)?;
        let Some(credential) = session.credential.as_ref() else {
            return Err(RealtimeError::StaleState(user_id));
        };

        let Some(author) = event.author().filter(|a| !a.is_empty()) else {
            return Err(RealtimeError::Decode(format!(
                "comment {}: author {} missing from users",
                event.comments.id, event.comments.created_by
            )));
        };
        if projector::is_self_authored(author, &credential.username) {
            return Ok(RouteOutcome::SelfAuthored);
        }

        let comment = &event.comments;
        if self
            .dedup
            .should_suppress(DedupKey::comment(user_id, &comment.id))
        {
            debug!(%user_id, comment_id = %comment.id, "duplicate comment suppressed");
            return Ok(RouteOutcome::Duplicate);
        }

        let post = self.backend.fetch_post(credential, &comment.post_id).await?;
        let notification =
            projector::comment_notification(user_id, author, &post, &comment.body, &self.host);
        Ok(self.enqueue(notification))
    }

    fn on_post(&self, user_id: UserId, event: &OnePostResponse) -> Result<RouteOutcome> {
        let session = self.authorized_session(user_id)?;
        let own = session.username().unwrap_or_default();

        let post = event.post();
        if post.author.is_empty() {
            return Err(RealtimeError::Decode(format!(
                "post {}: author {} missing from roster",
                post.id, event.posts.created_by
            )));
        }
        if projector::is_self_authored(&post.author, own) {
            return Ok(RouteOutcome::SelfAuthored);
        }

        let notification = projector::post_notification(user_id, own, &post, &self.host);
        Ok(self.enqueue(notification))
    }

    fn enqueue(&self, notification: feedbridge_core::Notification) -> RouteOutcome {
        if self.outbox.send(notification) {
            RouteOutcome::Delivered
        } else {
            RouteOutcome::Dropped
        }
    }
}

#[async_trait]
impl PushEventHandler for EventRouter {
    async fn handle_event(&self, user_id: UserId, name: &str, data: Value) {
        match self.route(user_id, name, data).await {
            Ok(outcome) => {
                counter!(EVENTS_ROUTED_TOTAL, "outcome" => outcome.as_str()).increment(1);
                debug!(%user_id, event = name, %outcome, "push event routed");
            }
            Err(e) => {
                counter!(EVENTS_FAILED_TOTAL, "category" => e.category().as_str()).increment(1);
                warn!(
                    %user_id,
                    event = name,
                    error = %e,
                    category = %e.category(),
                    "dropping push event"
                );
            }
        }
    }
}
