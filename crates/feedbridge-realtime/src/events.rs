//! Typed push events.

use feedbridge_backend::wire::{NewCommentEvent, OnePostResponse};
use serde_json::Value;

use crate::errors::{RealtimeError, Result};

/// Event name of a new comment.
pub const COMMENT_NEW: &str = "comment:new";

/// Event name of a new post.
pub const POST_NEW: &str = "post:new";

/// A push event the bridge acts on.
#[derive(Clone, Debug)]
pub enum PushEvent {
    /// A comment was added to a post in the user's direct feed.
    NewComment(Box<NewCommentEvent>),
    /// A post arrived in the user's direct feed.
    NewPost(Box<OnePostResponse>),
    /// Any other event name.
    Other(String),
}

impl PushEvent {
    /// Decode an event by name. Unknown names are not an error.
    pub fn decode(name: &str, data: Value) -> Result<Self> {
        let decode_err = |e: serde_json::Error| RealtimeError::Decode(format!("{name}: {e}"));
        match name {
            COMMENT_NEW => Ok(Self::NewComment(Box::new(
                serde_json::from_value(data).map_err(decode_err)?,
            ))),
            POST_NEW => Ok(Self::NewPost(Box::new(
                serde_json::from_value(data).map_err(decode_err)?,
            ))),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}
