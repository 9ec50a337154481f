//! Command handling: one inbound message, one state transition, replies.
//!
//! Every message runs inside a [`Turn`], so the stored session is already
//! back to idle when the message is interpreted. [`classify`] decides what
//! the message means from the pre-reset snapshot; [`CommandHandler`] then
//! performs the backend call, persists the next session and replies.

use std::sync::Arc;

use feedbridge_backend::{Backend, BackendError};
use feedbridge_core::{Credential, Notification, Outbox, UserId};
use feedbridge_session::{
    Continuation, Mode, PendingReply, PushControl, Session, StateStore, StoreError,
    TransitionError, Turn,
};
use tracing::{debug, info, warn};

use crate::commands::Inbound;
use crate::messages;

/// Entries shown by `/list` without an argument.
pub const DEFAULT_LIST_COUNT: usize = 5;

/// What an inbound message asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// `/cancel`.
    Cancel,
    /// `/help`.
    Help,
    /// `/start`.
    Start,
    /// Free text while a token was awaited.
    VerifyToken(String),
    /// `/logout`.
    Logout,
    /// `/contacts`.
    Contacts,
    /// `/to_<name>`.
    ComposeTo(String),
    /// Free text while composing.
    SendPost {
        /// Addressees collected so far.
        targets: Vec<String>,
        /// Post body.
        body: String,
    },
    /// `/re_<code>`.
    PickPost(String),
    /// Any message while a comment was awaited.
    SendComment {
        /// Post being commented.
        reply: PendingReply,
        /// Comment text, `None` for non-text messages.
        body: Option<String>,
    },
    /// A reply to a bot message carrying a `/re_<code>` shortcut.
    CommentOnShortcode {
        /// Shortcode from the replied-to message.
        code: String,
        /// Comment text, `None` for non-text messages.
        body: Option<String>,
    },
    /// `/list [n]`.
    List(usize),
    /// Anything else.
    Unknown,
}

impl Action {
    /// Stable label for logs. Never includes message text.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Help => "help",
            Self::Start => "start",
            Self::VerifyToken(_) => "verify_token",
            Self::Logout => "logout",
            Self::Contacts => "contacts",
            Self::ComposeTo(_) => "compose_to",
            Self::SendPost { .. } => "send_post",
            Self::PickPost(_) => "pick_post",
            Self::SendComment { .. } => "send_comment",
            Self::CommentOnShortcode { .. } => "comment_on_shortcode",
            Self::List(_) => "list",
            Self::Unknown => "unknown",
        }
    }
}

/// Interpret a message against the session as it was when it arrived.
///
/// Commands win over continuations. Commands other than `/cancel`, `/help`
/// and `/start` need authorization and are [`Action::Unknown`] otherwise.
pub fn classify(turn: &Turn, msg: &Inbound) -> Action {
    let authorized = turn.snapshot().is_authorized();

    if let Some(cmd) = msg.command() {
        return match cmd.name.as_str() {
            "cancel" => Action::Cancel,
            "help" => Action::Help,
            "start" => Action::Start,
            _ if !authorized => Action::Unknown,
            "logout" => Action::Logout,
            "contacts" => Action::Contacts,
            "list" => Action::List(list_count(&cmd.args)),
            other => {
                if let Some(name) = other.strip_prefix("to_") {
                    Action::ComposeTo(name.to_string())
                } else if let Some(code) = other.strip_prefix("re_") {
                    Action::PickPost(code.to_string())
                } else {
                    Action::Unknown
                }
            }
        };
    }

    let text = msg.text.clone();
    match turn.continuation(text.is_some()) {
        Some(Continuation::Token) => Action::VerifyToken(text.unwrap_or_default()),
        Some(Continuation::Post { targets }) => Action::SendPost {
            targets,
            body: text.unwrap_or_default(),
        },
        Some(Continuation::Comment(reply)) => Action::SendComment { reply, body: text },
        None => match msg.reply_shortcode() {
            Some(code) if authorized => Action::CommentOnShortcode { code, body: text },
            _ => Action::Unknown,
        },
    }
}

fn list_count(args: &str) -> usize {
    args.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIST_COUNT)
}

/// Applies inbound messages to sessions.
pub struct CommandHandler {
    store: Arc<dyn StateStore>,
    backend: Arc<dyn Backend>,
    push: Arc<dyn PushControl>,
    outbox: Outbox,
    host: String,
}

impl CommandHandler {
    /// Handler replying through `outbox`; `host` is used for post links.
    pub fn new(
        store: Arc<dyn StateStore>,
        backend: Arc<dyn Backend>,
        push: Arc<dyn PushControl>,
        outbox: Outbox,
        host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            push,
            outbox,
            host: host.into(),
        }
    }

    /// Handle one message. Store failures are logged and reported to the user.
    pub async fn handle(&self, msg: Inbound) {
        let user_id = msg.user_id;
        if let Err(e) = self.dispatch(msg).await {
            warn!(%user_id, error = %e, category = %e.category(), "message handling failed");
            self.reply(user_id, messages::failed(&e));
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn dispatch(&self, msg: Inbound) -> Result<(), StoreError> {
        let user_id = msg.user_id;
        let turn = Turn::begin(self.store.as_ref(), user_id)?;
        let action = classify(&turn, &msg);
        debug!(
            %user_id,
            previous_mode = %turn.previous_mode(),
            action = action.name(),
            "handling message"
        );

        let session = turn.snapshot();
        match action {
            Action::Cancel => {
                let text = match turn.previous_mode() {
                    Mode::Idle => messages::NOTHING_TO_CANCEL.to_string(),
                    mode => messages::cancelled(mode.title()),
                };
                self.reply(user_id, text);
            }
            Action::Help => self.reply(user_id, messages::HELP),
            Action::Start => match session.username() {
                Some(name) => self.reply(user_id, messages::already_known(name)),
                None => {
                    for text in messages::HELLO {
                        self.reply(user_id, text);
                    }
                    self.store.save(&session.await_token())?;
                }
            },
            Action::VerifyToken(token) => self.verify_token(&turn, &token).await?,
            Action::Logout => {
                let _ = self.push.stop(user_id);
                self.store.save(&session.logout())?;
                info!(%user_id, "user logged out");
                self.reply(user_id, messages::FORGOTTEN);
            }
            Action::Contacts => {
                if let Some(cred) = self.require(session) {
                    match self.backend.fetch_contacts(cred).await {
                        Ok(names) if names.is_empty() => self.reply(user_id, messages::NO_CONTACTS),
                        Ok(names) => self.reply(user_id, messages::contacts(&names)),
                        Err(e) => self.backend_failed(user_id, &e),
                    }
                }
            }
            Action::ComposeTo(name) => match session.compose_to(&name) {
                Ok(next) => {
                    self.store.save(&next)?;
                    let own = next.username().unwrap_or_default();
                    self.reply(user_id, messages::compose_prompt(&next.compose_targets, own));
                }
                Err(TransitionError::EmptyAddressee) => self.reply(user_id, messages::NO_ADDRESSEE),
                Err(TransitionError::NotAuthorized) => self.reply(user_id, messages::NEED_TOKEN),
            },
            Action::SendPost { targets, body } => {
                if let Some(cred) = self.require(session) {
                    match self.backend.submit_post(cred, &targets, &body).await {
                        Ok(post_id) => {
                            info!(%user_id, %post_id, addressees = targets.len(), "direct post sent");
                            let text = messages::post_sent(&cred.username, &post_id, &self.host);
                            let _ = self
                                .outbox
                                .send(Notification::text(user_id, text).without_preview());
                        }
                        Err(e) => {
                            warn!(%user_id, error = %e, category = %e.category(), "direct post failed");
                            self.reply(user_id, messages::post_failed(&e));
                        }
                    }
                }
            }
            Action::PickPost(code) => {
                if let Some(cred) = self.require(session) {
                    match self.backend.find_post_by_shortcode(cred, &code).await {
                        Ok(post) => match session.reply_to(&post.id, &post.author) {
                            Ok(next) => {
                                self.store.save(&next)?;
                                self.reply(user_id, messages::comment_prompt(&post));
                            }
                            Err(_) => self.reply(user_id, messages::NEED_TOKEN),
                        },
                        Err(e) => self.backend_failed(user_id, &e),
                    }
                }
            }
            Action::SendComment { reply, body } => match body {
                None => {
                    turn.restore(self.store.as_ref())?;
                    self.reply(user_id, messages::COMMENT_TEXT_ONLY);
                }
                Some(body) => {
                    if let Some(cred) = self.require(session) {
                        self.comment(user_id, cred, &reply.post_id, &reply.post_author, &body)
                            .await;
                    }
                }
            },
            Action::CommentOnShortcode { code, body } => {
                if let Some(cred) = self.require(session) {
                    match self.backend.find_post_by_shortcode(cred, &code).await {
                        Ok(post) => match body {
                            Some(body) => {
                                self.comment(user_id, cred, &post.id, &post.author, &body)
                                    .await;
                            }
                            None => self.reply(user_id, messages::REPLY_TEXT_ONLY),
                        },
                        Err(e) => self.backend_failed(user_id, &e),
                    }
                }
            }
            Action::List(count) => {
                if let Some(cred) = self.require(session) {
                    self.list(user_id, cred, count).await;
                }
            }
            Action::Unknown => {
                let text = if session.is_authorized() {
                    messages::NOT_UNDERSTOOD
                } else {
                    messages::NEED_TOKEN
                };
                self.reply(user_id, text);
            }
        }
        Ok(())
    }

    async fn verify_token(&self, turn: &Turn, token: &str) -> Result<(), StoreError> {
        let session = turn.snapshot();
        let user_id = session.user_id;
        self.reply(user_id, messages::CHECKING_TOKEN);

        match self.backend.verify_credential(token).await {
            Ok(credential) => {
                let next = session.authorize(credential);
                self.store.save(&next)?;
                let username = next.username().unwrap_or_default();
                info!(%user_id, %username, "user authorized");
                self.reply(user_id, messages::welcome(username));
                if !self.push.start(&next) {
                    warn!(%user_id, "push session was not started");
                }
            }
            Err(e) if e.is_unauthorized() => {
                turn.restore(self.store.as_ref())?;
                self.reply(user_id, messages::BAD_TOKEN);
            }
            Err(e) => {
                warn!(%user_id, error = %e, category = %e.category(), "token check failed");
                turn.restore(self.store.as_ref())?;
                self.reply(user_id, messages::failed_retry(&e));
            }
        }
        Ok(())
    }

    async fn comment(
        &self,
        user_id: UserId,
        credential: &Credential,
        post_id: &str,
        post_author: &str,
        body: &str,
    ) {
        match self.backend.submit_comment(credential, post_id, body).await {
            Ok(()) => {
                info!(%user_id, %post_id, "comment sent");
                self.reply(user_id, messages::comment_sent(post_author, post_id, &self.host));
            }
            Err(e) => self.backend_failed(user_id, &e),
        }
    }

    async fn list(&self, user_id: UserId, credential: &Credential, count: usize) {
        let mut posts = match self.backend.fetch_direct_posts(credential).await {
            Ok(posts) => posts,
            Err(e) => return self.backend_failed(user_id, &e),
        };
        if posts.is_empty() {
            return self.reply(user_id, messages::NO_POSTS);
        }

        posts.truncate(count);
        let total = posts.len();
        self.reply(user_id, messages::list_header(total));
        for (i, post) in posts.iter().rev().enumerate() {
            self.reply(
                user_id,
                messages::list_entry(i + 1, total, post, &credential.username, &self.host),
            );
        }
    }

    /// Credential of an authorized session; tells the user to log in otherwise.
    fn require<'a>(&self, session: &'a Session) -> Option<&'a Credential> {
        let credential = session.credential.as_ref();
        if credential.is_none() {
            self.reply(session.user_id, messages::NEED_TOKEN);
        }
        credential
    }

    fn backend_failed(&self, user_id: UserId, error: &BackendError) {
        if error.is_not_found() {
            self.reply(user_id, messages::POST_NOT_FOUND);
        } else {
            warn!(%user_id, error = %error, category = %error.category(), "backend call failed");
            self.reply(user_id, messages::failed(error));
        }
    }

    fn reply(&self, user_id: UserId, text: impl Into<String>) {
        let _ = self.outbox.send_text(user_id, text);
    }
}
