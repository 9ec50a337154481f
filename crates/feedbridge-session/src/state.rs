//! Session record and its transitions.
//!
//! Transitions are pure: each takes the current [`Session`] and returns the
//! next one. Persisting the result is the caller's job, which keeps the
//! reset-then-reinterpret ordering in [`crate::turn`] explicit.

use std::fmt;

use feedbridge_core::{Credential, UserId};
use serde::{Deserialize, Serialize};

use crate::errors::TransitionError;

/// Conversational mode of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No pending action.
    #[default]
    Idle,
    /// Waiting for the user to paste a backend access token.
    AwaitingToken,
    /// Collecting addressees; the next free text is sent as a direct post.
    ComposingPost,
    /// The next free text is posted as a comment on the pending post.
    AwaitingComment,
}

impl Mode {
    /// Human-readable name of the pending action.
    pub fn title(self) -> &'static str {
        match self {
            Self::Idle => "nothing",
            Self::AwaitingToken => "token setup",
            Self::ComposingPost => "direct message",
            Self::AwaitingComment => "comment",
        }
    }

    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingToken => "awaiting_token",
            Self::ComposingPost => "composing_post",
            Self::AwaitingComment => "awaiting_comment",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post a pending comment will be attached to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReply {
    /// Backend post id.
    pub post_id: String,
    /// Username of the post author, used for the permalink.
    pub post_author: String,
}

/// Persisted per-user state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Chat-transport user key.
    pub user_id: UserId,
    /// Current conversational mode.
    #[serde(default)]
    pub mode: Mode,
    /// Backend credential. Present iff the user is authorized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    /// Sorted, unique addressees collected in [`Mode::ComposingPost`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compose_targets: Vec<String>,
    /// Target of the comment awaited in [`Mode::AwaitingComment`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_reply: Option<PendingReply>,
}

impl Session {
    /// Fresh session for a user seen for the first time.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            mode: Mode::Idle,
            credential: None,
            compose_targets: Vec::new(),
            pending_reply: None,
        }
    }

    /// Whether the user has a verified credential.
    pub fn is_authorized(&self) -> bool {
        self.credential.is_some()
    }

    /// Backend username, if authorized.
    pub fn username(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.username.as_str())
    }

    /// Same user and credential in `mode`, with compose and reply context
    /// cleared.
    fn with_mode(&self, mode: Mode) -> Self {
        Self {
            user_id: self.user_id,
            mode,
            credential: self.credential.clone(),
            compose_targets: Vec::new(),
            pending_reply: None,
        }
    }

    /// Back to [`Mode::Idle`], dropping any pending action.
    #[must_use]
    pub fn reset(&self) -> Self {
        self.with_mode(Mode::Idle)
    }

    /// Explicit cancel. Identical to [`Session::reset`].
    #[must_use]
    pub fn cancel(&self) -> Self {
        self.reset()
    }

    /// Start waiting for a token.
    #[must_use]
    pub fn await_token(&self) -> Self {
        self.with_mode(Mode::AwaitingToken)
    }

    /// Attach a verified credential and return to [`Mode::Idle`].
    #[must_use]
    pub fn authorize(&self, credential: Credential) -> Self {
        let mut next = self.with_mode(Mode::Idle);
        next.credential = Some(credential);
        next
    }

    /// Forget the credential and return to [`Mode::Idle`].
    #[must_use]
    pub fn logout(&self) -> Self {
        let mut next = self.with_mode(Mode::Idle);
        next.credential = None;
        next
    }

    /// Add an addressee to the post being composed.
    ///
    /// Entering [`Mode::ComposingPost`] from another mode starts a new target
    /// list; while already composing, the name is inserted at its sorted
    /// position unless it is already present.
    pub fn compose_to(&self, name: &str) -> Result<Self, TransitionError> {
        if !self.is_authorized() {
            return Err(TransitionError::NotAuthorized);
        }
        if name.is_empty() {
            return Err(TransitionError::EmptyAddressee);
        }

        let mut next = if self.mode == Mode::ComposingPost {
            self.clone()
        } else {
            self.with_mode(Mode::ComposingPost)
        };
        if let Err(pos) = next.compose_targets.binary_search_by(|t| t.as_str().cmp(name)) {
            next.compose_targets.insert(pos, name.to_string());
        }
        Ok(next)
    }

    /// Wait for a comment on the given post.
    pub fn reply_to(&self, post_id: &str, post_author: &str) -> Result<Self, TransitionError> {
        if !self.is_authorized() {
            return Err(TransitionError::NotAuthorized);
        }
        let mut next = self.with_mode(Mode::AwaitingComment);
        next.pending_reply = Some(PendingReply {
            post_id: post_id.to_string(),
            post_author: post_author.to_string(),
        });
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn cred() -> Credential {
        Credential {
            username: "alice".into(),
            access_token: "tok".into(),
            feed_handle: "feed-a".into(),
        }
    }

    fn authorized() -> Session {
        Session::new(UserId::new(1)).authorize(cred())
    }

    #[test]
    fn new_session_is_idle_and_unauthorized() {
        let s = Session::new(UserId::new(5));
        assert_eq!(s.mode, Mode::Idle);
        assert!(!s.is_authorized());
        assert!(s.username().is_none());
    }

    #[test]
    fn compose_targets_sorted_and_unique() {
        let mut s = authorized();
        for name in ["bob", "alice", "bob"] {
            s = s.compose_to(name).unwrap();
        }
        assert_eq!(s.mode, Mode::ComposingPost);
        assert_eq!(s.compose_targets, vec!["alice", "bob"]);
    }

    #[test]
    fn compose_from_other_mode_starts_fresh() {
        let s = authorized().compose_to("carol").unwrap();
        let waiting = s.reply_to("p1", "dave").unwrap();
        let again = waiting.compose_to("bob").unwrap();
        assert_eq!(again.compose_targets, vec!["bob"]);
        assert!(again.pending_reply.is_none());
    }

    #[test]
    fn compose_requires_authorization() {
        let s = Session::new(UserId::new(1));
        assert_matches!(s.compose_to("bob"), Err(TransitionError::NotAuthorized));
        assert_matches!(s.reply_to("p", "a"), Err(TransitionError::NotAuthorized));
    }

    #[test]
    fn compose_rejects_empty_name() {
        assert_matches!(
            authorized().compose_to(""),
            Err(TransitionError::EmptyAddressee)
        );
    }

    #[test]
    fn reset_clears_context_and_keeps_credential() {
        let s = authorized().compose_to("bob").unwrap();
        let r = s.reset();
        assert_eq!(r.mode, Mode::Idle);
        assert!(r.compose_targets.is_empty());
        assert!(r.is_authorized());

        let c = authorized().reply_to("p1", "bob").unwrap().cancel();
        assert!(c.pending_reply.is_none());
        assert_eq!(c.mode, Mode::Idle);
    }

    #[test]
    fn reply_to_sets_pending_context() {
        let s = authorized().reply_to("p123", "bob").unwrap();
        assert_eq!(s.mode, Mode::AwaitingComment);
        assert_eq!(
            s.pending_reply,
            Some(PendingReply {
                post_id: "p123".into(),
                post_author: "bob".into()
            })
        );
    }

    #[test]
    fn logout_clears_credential() {
        let s = authorized().compose_to("bob").unwrap().logout();
        assert!(!s.is_authorized());
        assert_eq!(s.mode, Mode::Idle);
        assert!(s.compose_targets.is_empty());
    }

    #[test]
    fn await_token_keeps_user() {
        let s = Session::new(UserId::new(9)).await_token();
        assert_eq!(s.mode, Mode::AwaitingToken);
        assert_eq!(s.user_id, UserId::new(9));
    }

    #[test]
    fn serde_roundtrip_omits_empty_context() {
        let s = authorized();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["mode"], "idle");
        assert!(json.get("composeTargets").is_none());
        assert!(json.get("pendingReply").is_none());
        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn mode_titles() {
        assert_eq!(Mode::AwaitingComment.title(), "comment");
        assert_eq!(Mode::ComposingPost.to_string(), "composing_post");
    }
}
