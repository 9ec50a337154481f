//! Notification text for push events.

use feedbridge_core::text::{RULE, human_list};
use feedbridge_core::{Notification, Post, UserId};

/// Title substituted for the reader's own name in addressee lists.
pub const OWN_TITLE: &str = "you";

/// Whether an event author is the session owner.
pub fn is_self_authored(author: &str, own_username: &str) -> bool {
    author == own_username
}

/// Notification for a new comment on `post`.
pub fn comment_notification(
    user_id: UserId,
    author: &str,
    post: &Post,
    comment_body: &str,
    host: &str,
) -> Notification {
    let text = format!(
        "💬 {author} replied to the post «{short}»:\n\
         {RULE}\n\
         {comment_body}\n\
         {RULE}\n\
         Reply: /re_{code}\n\
         Open: {link}\n",
        short = post.short_body(),
        code = post.shortcode(),
        link = post.permalink(host),
    );
    Notification::text(user_id, text)
}

/// Notification for a new direct post.
pub fn post_notification(user_id: UserId, own_username: &str, post: &Post, host: &str) -> Notification {
    let text = format!(
        "📨 {author} wrote to {to}:\n\
         {RULE}\n\
         {body}\n\
         {RULE}\n\
         Reply: /re_{code}\n\
         Open: {link}\n",
        author = post.author,
        to = human_list(&post.addressees, own_username, OWN_TITLE),
        body = post.body,
        code = post.shortcode(),
        link = post.permalink(host),
    );
    Notification::text(user_id, text)
}
