//! Inbound chat messages and command parsing.

use std::sync::LazyLock;

use feedbridge_core::UserId;
use regex::Regex;

/// Reply shortcut inside a bot message, e.g. `Reply: /re_p1a2`.
static REPLY_SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/re_([a-f0-9]{4,})").unwrap());

/// A chat message, independent of the transport it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    /// Sender.
    pub user_id: UserId,
    /// Message text. `None` for non-text messages.
    pub text: Option<String>,
    /// Text of the message this one replies to, if any.
    pub reply_to_text: Option<String>,
}

impl Inbound {
    /// Text message without a reply context. Empty text counts as none.
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            user_id,
            text: (!text.is_empty()).then_some(text),
            reply_to_text: None,
        }
    }

    /// Mark this message as a reply to `text`.
    #[must_use]
    pub fn replying_to(mut self, text: impl Into<String>) -> Self {
        self.reply_to_text = Some(text.into());
        self
    }

    /// Parsed command, if the text starts with one.
    pub fn command(&self) -> Option<Command> {
        self.text.as_deref().and_then(parse_command)
    }

    /// Shortcode of the post referenced by the replied-to message.
    pub fn reply_shortcode(&self) -> Option<String> {
        self.reply_to_text.as_deref().and_then(reply_shortcode)
    }
}

/// `/name args`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Command name without the slash and `@bot` suffix.
    pub name: String,
    /// Trimmed text after the command word.
    pub args: String,
}

/// Parse `/name[@bot] [args]`. Returns `None` for plain text.
pub fn parse_command(text: &str) -> Option<Command> {
    let rest = text.strip_prefix('/')?;
    let (word, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let name = word.split_once('@').map_or(word, |(name, _)| name);
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name: name.to_string(),
        args: args.trim().to_string(),
    })
}

/// Last `/re_<code>` shortcut in a message.
pub fn reply_shortcode(text: &str) -> Option<String> {
    REPLY_SHORTCODE
        .captures_iter(text)
        .last()
        .map(|c| c[1].to_string())
}
