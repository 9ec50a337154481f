//! JSON shapes exchanged with the backend, over REST and the push socket.
//!
//! Responses carry their referenced users and feeds in side tables
//! (`subscribers`, `users`, `subscriptions`); [`Roster`] resolves ids
//! against them.

use feedbridge_core::Post;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Feed name of a user's direct-message feed.
pub const DIRECTS_FEED: &str = "Directs";

/// Feed name of a user's own posts feed.
pub const POSTS_FEED: &str = "Posts";

/// `{id, username}` entry of a user side table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserRef {
    /// Backend user id.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: String,
}

/// `{id, name, user}` entry of the `subscriptions` side table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FeedRef {
    /// Feed id.
    pub id: String,
    /// Feed kind, e.g. [`DIRECTS_FEED`] or [`POSTS_FEED`].
    #[serde(default)]
    pub name: String,
    /// Owner user id.
    #[serde(default)]
    pub user: String,
}

/// Side tables shared by post-bearing responses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Roster {
    /// Users referenced as subscribers.
    #[serde(default)]
    pub subscribers: Vec<UserRef>,
    /// Other referenced users.
    #[serde(default)]
    pub users: Vec<UserRef>,
    /// Referenced feeds.
    #[serde(default)]
    pub subscriptions: Vec<FeedRef>,
}

impl Roster {
    /// Username for a user id, searching `subscribers` before `users`.
    pub fn username(&self, user_id: &str) -> Option<&str> {
        self.subscribers
            .iter()
            .chain(&self.users)
            .find(|u| u.id == user_id)
            .map(|u| u.username.as_str())
    }

    /// Owner username and kind of a feed.
    pub fn feed(&self, feed_id: &str) -> Option<(&str, &str)> {
        let feed = self.subscriptions.iter().find(|f| f.id == feed_id)?;
        let owner = self.username(&feed.user).unwrap_or_default();
        Some((owner, feed.name.as_str()))
    }

    /// Resolve a raw post into a [`Post`].
    ///
    /// Addressees are the owners of the post's direct feeds, author excluded.
    pub fn resolve_post(&self, raw: &RawPost) -> Post {
        let author = self.username(&raw.created_by).map_or_else(
            || {
                warn!(user_id = %raw.created_by, post_id = %raw.id, "post author missing from roster");
                String::new()
            },
            str::to_string,
        );
        let addressees = raw
            .posted_to
            .iter()
            .filter_map(|fid| self.feed(fid))
            .filter(|(owner, kind)| *kind == DIRECTS_FEED && *owner != author)
            .map(|(owner, _)| owner.to_string())
            .collect();

        Post {
            id: raw.id.clone(),
            body: raw.body.clone(),
            author,
            addressees,
        }
    }
}

/// A post as serialized by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    /// Post id.
    pub id: String,
    /// Author user id.
    #[serde(default)]
    pub created_by: String,
    /// Post body.
    #[serde(default)]
    pub body: String,
    /// Feed ids the post is published to.
    #[serde(default)]
    pub posted_to: Vec<String>,
}

/// A comment as serialized by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComment {
    /// Comment id.
    pub id: String,
    /// Comment body.
    #[serde(default)]
    pub body: String,
    /// Author user id.
    #[serde(default)]
    pub created_by: String,
    /// Parent post id.
    #[serde(default)]
    pub post_id: String,
}

/// `{id, user}` of the requested timeline.
#[derive(Clone, Debug, Deserialize)]
pub struct TimelineRef {
    /// Feed id.
    pub id: String,
    /// Owner user id.
    pub user: String,
}

/// Response of `GET /v2/timelines/filter/directs`.
#[derive(Clone, Debug, Deserialize)]
pub struct DirectsResponse {
    /// Side tables.
    #[serde(flatten)]
    pub roster: Roster,
    /// The requesting user's direct feed.
    #[serde(default)]
    pub timelines: Option<TimelineRef>,
    /// Posts of the feed, newest first.
    #[serde(default)]
    pub posts: Vec<RawPost>,
}

impl DirectsResponse {
    /// Every post, resolved, in response order.
    pub fn all_posts(&self) -> Vec<Post> {
        self.posts
            .iter()
            .map(|p| self.roster.resolve_post(p))
            .collect()
    }
}

/// Response of `GET /v2/posts/<id>`, also the `post:new` push payload.
#[derive(Clone, Debug, Deserialize)]
pub struct OnePostResponse {
    /// Side tables.
    #[serde(flatten)]
    pub roster: Roster,
    /// The post.
    pub posts: RawPost,
}

impl OnePostResponse {
    /// The post, resolved.
    pub fn post(&self) -> Post {
        self.roster.resolve_post(&self.posts)
    }
}

/// `comment:new` push payload.
#[derive(Clone, Debug, Deserialize)]
pub struct NewCommentEvent {
    /// The comment.
    pub comments: RawComment,
    /// Users referenced by the comment.
    #[serde(default)]
    pub users: Vec<UserRef>,
}

impl NewCommentEvent {
    /// Username of the comment author.
    pub fn author(&self) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == self.comments.created_by)
            .map(|u| u.username.as_str())
    }
}

/// `users` object of `GET /v2/users/whoami`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WhoAmIUser {
    /// Users subscribed to the requesting user.
    #[serde(default)]
    pub subscribers: Vec<UserRef>,
}

/// Response of `GET /v2/users/whoami`.
#[derive(Clone, Debug, Deserialize)]
pub struct WhoAmIResponse {
    /// The requesting user.
    #[serde(default)]
    pub users: WhoAmIUser,
    /// Feeds the requesting user subscribes to.
    #[serde(default)]
    pub subscriptions: Vec<FeedRef>,
}

impl WhoAmIResponse {
    /// Mutual contacts: subscribers whose posts feed the user subscribes to.
    /// Sorted, without duplicates.
    pub fn mutual_contacts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|s| s.name == POSTS_FEED)
            .filter_map(|s| {
                self.users
                    .subscribers
                    .iter()
                    .find(|u| u.id == s.user && !u.username.is_empty())
            })
            .map(|u| u.username.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// `{"posts": {"id": ..}}` returned after creating a post.
#[derive(Clone, Debug, Deserialize)]
pub struct PostCreated {
    /// The created post.
    pub posts: PostIdRef,
}

/// `{id}` wrapper.
#[derive(Clone, Debug, Deserialize)]
pub struct PostIdRef {
    /// Post id.
    pub id: String,
}

/// `{"err": ..}` body of a failed request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// Backend error message.
    #[serde(default)]
    pub err: Option<String>,
}

/// Body of `POST /v1/posts`.
#[derive(Clone, Debug, Serialize)]
pub struct NewPostRequest {
    /// Target feeds.
    pub meta: NewPostMeta,
    /// Post content.
    pub post: NewPostBody,
}

/// `meta` of [`NewPostRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct NewPostMeta {
    /// Usernames whose direct feeds receive the post.
    pub feeds: Vec<String>,
}

/// `post` of [`NewPostRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct NewPostBody {
    /// Post body.
    pub body: String,
}

/// Body of `POST /v1/comments`.
#[derive(Clone, Debug, Serialize)]
pub struct NewCommentRequest {
    /// Comment content.
    pub comment: NewCommentBody,
}

/// `comment` of [`NewCommentRequest`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentBody {
    /// Comment body.
    pub body: String,
    /// Parent post id.
    pub post_id: String,
}
