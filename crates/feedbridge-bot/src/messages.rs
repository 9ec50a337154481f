//! Reply texts.

use feedbridge_core::Post;
use feedbridge_core::text::{RULE, human_list, human_name};

/// Substitute for the reader's own name in subject position.
pub const YOU: &str = "you";

/// Command reference.
pub const HELP: &str = "I forward your direct messages and comments on them, and let you answer right here.\n\
\n\
/contacts - your mutual friends, the people you can write to\n\
/to_<name> - write a direct message; tap several names to add recipients\n\
/re_<code> - comment on a message; you can also just reply to my notification\n\
/list [n] - show your last n direct messages (5 by default)\n\
/cancel - cancel the current operation\n\
/logout - forget your token and stop notifications\n\
/help - this text";

/// Greeting sequence sent by `/start` to a new user.
pub const HELLO: [&str; 2] = [
    "Hi! I deliver your direct messages and comments on them, and let you reply without leaving the chat.",
    "To begin, send me your access token. You can create one in the settings of your account.",
];

/// Sent while verifying a token.
pub const CHECKING_TOKEN: &str = "Thanks, checking your token…";

/// The backend rejected the token.
pub const BAD_TOKEN: &str = "Looks like the token is wrong. Try again?";

/// Nothing pending on `/cancel`.
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel. Use /help to see the list of commands.";

/// Confirmation of `/logout`.
pub const FORGOTTEN: &str =
    "Done, I forgot you and erased everything I knew. If you want to come back, use /start";

/// `/contacts` with an empty result.
pub const NO_CONTACTS: &str =
    "Looks like you have no mutual friends, so you cannot write a direct message to anyone.";

/// `/to_` without a name.
pub const NO_ADDRESSEE: &str = "Please add a name after /to_, for example /to_alice";

/// Shortcode lookup failed.
pub const POST_NOT_FOUND: &str = "Message not found.";

/// `/list` with an empty result.
pub const NO_POSTS: &str = "Looks like you have no direct messages.";

/// Non-text input while a comment is pending.
pub const COMMENT_TEXT_ONLY: &str =
    "Sorry, a comment can only be text. Try again (/cancel to abort)?";

/// Non-text reply to a notification.
pub const REPLY_TEXT_ONLY: &str = "Sorry, a comment can only be text. Try again?";

/// Any input from a user without a token.
pub const NEED_TOKEN: &str =
    "Unfortunately I can't do much without your token. Use /start to set it.";

/// Unrecognized input from an authorized user.
pub const NOT_UNDERSTOOD: &str = "Sorry, I don't understand. Use /help to see the list of commands.";

/// `/cancel` with a pending action.
pub fn cancelled(title: &str) -> String {
    format!("OK, the {title} operation is cancelled.")
}

/// `/start` from an authorized user.
pub fn already_known(username: &str) -> String {
    format!("We've already met, {username}. If you want me to forget you, use /logout")
}

/// Token accepted.
pub fn welcome(username: &str) -> String {
    format!(
        "Nice to meet you, {username}!\n\
         I'll let you know about new direct messages and comments on them. \
         Use /help to learn what else I can do."
    )
}

/// Backend failure with a retry hint.
pub fn failed_retry(error: &dyn std::fmt::Display) -> String {
    format!("Something went wrong: {error}\nTry again?")
}

/// Backend failure.
pub fn failed(error: &dyn std::fmt::Display) -> String {
    format!("Something went wrong: {error}")
}

/// Post submission failure.
pub fn post_failed(error: &dyn std::fmt::Display) -> String {
    format!("Could not send the message. {error}")
}

/// `/contacts` listing.
pub fn contacts(names: &[String]) -> String {
    let mut lines = vec!["Your mutual friends:".to_string()];
    lines.extend(names.iter().map(|n| format!("    /to_{n}")));
    lines.push("You can write to several people at once by tapping their names one by one.".into());
    lines.join("\n")
}

/// Prompt after each `/to_`.
pub fn compose_prompt(targets: &[String], own_username: &str) -> String {
    format!(
        "OK, your message to {} (/cancel to abort):",
        human_list(targets, own_username, YOU)
    )
}

/// Prompt after `/re_`.
pub fn comment_prompt(post: &Post) -> String {
    format!(
        "OK, your comment on {}'s message «{}» (/cancel to abort):",
        post.author,
        post.short_body()
    )
}

fn footer(post_author: &str, post_id: &str, host: &str) -> String {
    let code = feedbridge_core::text::shortcode(post_id);
    format!(
        "{RULE}\n\
         Reply: /re_{code} or reply to this message\n\
         Open: https://{host}/{post_author}/{post_id}\n"
    )
}

/// Confirmation of a sent direct message.
pub fn post_sent(own_username: &str, post_id: &str, host: &str) -> String {
    format!("Message sent!\n{}", footer(own_username, post_id, host))
}

/// Confirmation of a sent comment.
pub fn comment_sent(post_author: &str, post_id: &str, host: &str) -> String {
    format!("Comment sent!\n{}", footer(post_author, post_id, host))
}

/// Header of a `/list` reply.
pub fn list_header(count: usize) -> String {
    format!("Your direct messages ({count}):")
}

/// One `/list` entry, `index` counting from 1.
pub fn list_entry(index: usize, total: usize, post: &Post, own_username: &str, host: &str) -> String {
    format!(
        "{index}/{total} ✉ {author} → {to}:\n\
         {RULE}\n\
         {body}\n\
         {footer}",
        author = human_name(&post.author, own_username, YOU),
        to = human_list(&post.addressees, own_username, YOU),
        body = post.body,
        footer = footer(&post.author, &post.id, host),
    )
}
