//! Domain model shared between the backend client, session state and the
//! realtime bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text;

/// A verified backend credential.
///
/// Present on a session iff the user has authenticated. The feed handle is
/// always populated together with the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Backend username of the credential owner.
    pub username: String,
    /// Backend access token.
    pub access_token: String,
    /// Identifier of the owner's private direct-message feed.
    pub feed_handle: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("feed_handle", &self.feed_handle)
            .finish_non_exhaustive()
    }
}

/// A post as seen by the bridge, with usernames already resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Backend post id.
    pub id: String,
    /// Full post body.
    pub body: String,
    /// Author username.
    pub author: String,
    /// Usernames of the direct-message addressees, author excluded.
    pub addressees: Vec<String>,
}

impl Post {
    /// Body shortened for context lines.
    pub fn short_body(&self) -> String {
        text::short_body(&self.body)
    }

    /// Terse reply reference (first four characters of the id).
    pub fn shortcode(&self) -> &str {
        text::shortcode(&self.id)
    }

    /// Web link to the post on the given backend host.
    pub fn permalink(&self, host: &str) -> String {
        format!("https://{host}/{}/{}", self.author, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post {
            id: "p1234567".into(),
            body: "hello there".into(),
            author: "alice".into(),
            addressees: vec!["bob".into()],
        }
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = Credential {
            username: "alice".into(),
            access_token: "secret-token".into(),
            feed_handle: "feed-1".into(),
        };
        let debug = format!("{cred:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn credential_serializes_camel_case() {
        let cred = Credential {
            username: "alice".into(),
            access_token: "t".into(),
            feed_handle: "f".into(),
        };
        let value = serde_json::to_value(&cred).unwrap();
        assert_eq!(value["accessToken"], "t");
        assert_eq!(value["feedHandle"], "f");
    }

    #[test]
    fn post_shortcode_and_permalink() {
        let p = post();
        assert_eq!(p.shortcode(), "p123");
        assert_eq!(
            p.permalink("freefeed.net"),
            "https://freefeed.net/alice/p1234567"
        );
    }

    #[test]
    fn post_short_body_keeps_short_text() {
        assert_eq!(post().short_body(), "hello there");
    }
}
