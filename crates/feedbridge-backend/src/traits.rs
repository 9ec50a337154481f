//! The backend as seen by the bridge.

use async_trait::async_trait;
use feedbridge_core::{Credential, Post};

use crate::errors::{BackendError, Result};

/// Request/response calls against the social-feed backend, each keyed by a
/// user's credential.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Check an access token and resolve the owner's username and direct
    /// feed. Surrounding whitespace in `token` is ignored.
    async fn verify_credential(&self, token: &str) -> Result<Credential>;

    /// Posts of the user's direct feed, newest first.
    async fn fetch_direct_posts(&self, credential: &Credential) -> Result<Vec<Post>>;

    /// A single post by id.
    async fn fetch_post(&self, credential: &Credential, post_id: &str) -> Result<Post>;

    /// Publish a direct post to `addressees`. Returns the new post id.
    async fn submit_post(
        &self,
        credential: &Credential,
        addressees: &[String],
        body: &str,
    ) -> Result<String>;

    /// Comment on a post.
    async fn submit_comment(
        &self,
        credential: &Credential,
        post_id: &str,
        body: &str,
    ) -> Result<()>;

    /// Usernames the user can write to, sorted.
    async fn fetch_contacts(&self, credential: &Credential) -> Result<Vec<String>>;

    /// First direct post whose id starts with `shortcode`.
    async fn find_post_by_shortcode(&self, credential: &Credential, shortcode: &str) -> Result<Post> {
        self.fetch_direct_posts(credential)
            .await?
            .into_iter()
            .find(|p| p.id.starts_with(shortcode))
            .ok_or_else(|| BackendError::NotFound(format!("no direct post matches {shortcode}")))
    }
}
