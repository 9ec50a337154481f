//! Default-reset rule for one inbound message.
//!
//! Every message starts a [`Turn`]: the stored session is reset to
//! [`Mode::Idle`] *before* the message is interpreted, and the pre-reset
//! snapshot is kept. A message that continues the pending action (free text,
//! no command) is matched against that snapshot via [`Turn::continuation`].
//! Any other message finds the session already idle, so a pending action
//! expires after one unrelated message.

use feedbridge_core::UserId;
use tracing::debug;

use crate::errors::Result;
use crate::state::{Mode, PendingReply, Session};
use crate::store::StateStore;

/// Pending action that a free-text message completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// The text is a backend access token to verify.
    Token,
    /// The text is the body of a direct post to these addressees.
    Post {
        /// Sorted, unique addressee names.
        targets: Vec<String>,
    },
    /// The text is a comment on this post.
    Comment(PendingReply),
}

/// One message's view of the session.
#[derive(Clone, Debug)]
pub struct Turn {
    snapshot: Session,
}

impl Turn {
    /// Load the session and persist its reset form if it was not idle.
    pub fn begin(store: &dyn StateStore, user_id: UserId) -> Result<Self> {
        let snapshot = store.load(user_id)?;
        if snapshot.mode != Mode::Idle {
            debug!(%user_id, mode = %snapshot.mode, "resetting pending action");
            store.save(&snapshot.reset())?;
        }
        Ok(Self { snapshot })
    }

    /// Session as it was when the message arrived.
    pub fn snapshot(&self) -> &Session {
        &self.snapshot
    }

    /// Mode active when the message arrived.
    pub fn previous_mode(&self) -> Mode {
        self.snapshot.mode
    }

    /// Pending action continued by a message without a command.
    ///
    /// `has_text` is false for non-text messages (stickers, photos). Token
    /// and post continuations need text; a comment continuation is returned
    /// either way so the caller can ask again.
    pub fn continuation(&self, has_text: bool) -> Option<Continuation> {
        match self.snapshot.mode {
            Mode::Idle => None,
            Mode::AwaitingToken => has_text.then_some(Continuation::Token),
            Mode::ComposingPost => has_text.then(|| Continuation::Post {
                targets: self.snapshot.compose_targets.clone(),
            }),
            Mode::AwaitingComment => self
                .snapshot
                .pending_reply
                .clone()
                .map(Continuation::Comment),
        }
    }

    /// Put the snapshot back, keeping the pending action alive for another
    /// message.
    pub fn restore(&self, store: &dyn StateStore) -> Result<()> {
        store.save(&self.snapshot)
    }
}
