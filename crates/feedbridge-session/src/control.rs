//! Push connection lifecycle, as seen from the command layer.

use feedbridge_core::UserId;

use crate::state::Session;

/// Starts and stops the live push connection of a session.
///
/// Implemented by the realtime session registry. Both calls return
/// immediately; connection work happens in the background.
pub trait PushControl: Send + Sync {
    /// Start the push connection for an authorized session, replacing any
    /// existing one for the same user. Returns `false` if the session has no
    /// credential.
    fn start(&self, session: &Session) -> bool;

    /// Stop the push connection for a user. Returns whether one was running.
    /// Calling it again is a no-op.
    fn stop(&self, user_id: UserId) -> bool;
}
