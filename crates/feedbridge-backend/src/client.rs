//! `reqwest` implementation of [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use feedbridge_core::{Credential, Post};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::{BackendError, Result};
use crate::traits::Backend;
use crate::wire::{
    DirectsResponse, ErrorBody, NewCommentBody, NewCommentRequest, NewPostBody, NewPostMeta,
    NewPostRequest, OnePostResponse, PostCreated, WhoAmIResponse,
};

/// Header carrying the access token.
pub const AUTH_HEADER: &str = "X-Authentication-Token";

const DIRECTS_PATH: &str = "/v2/timelines/filter/directs?offset=0";

/// Characters left unescaped in an id used as a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection parameters for [`BackendClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://freefeed.net`. No trailing slash.
    pub base_url: String,
    /// `User-Agent` header, if any.
    pub user_agent: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// `https://<host>` with a 30 second timeout.
    pub fn for_host(host: &str) -> Self {
        Self {
            base_url: format!("https://{host}"),
            user_agent: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the backend REST API.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send a request and decode a successful JSON response.
    async fn call<T: DeserializeOwned>(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let bytes = self.send(token, method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(format!("{path}: {e}")))
    }

    async fn send(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(AUTH_HEADER, token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "backend request");

        let bytes = response.bytes().await?;
        if status == StatusCode::OK {
            return Ok(bytes.to_vec());
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|b| b.err)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());
        warn!(%method, path, status = status.as_u16(), error = %message, "backend request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            _ => BackendError::Other(message),
        })
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn verify_credential(&self, token: &str) -> Result<Credential> {
        let token = token.trim();
        let resp: DirectsResponse = self.call(token, Method::GET, DIRECTS_PATH, None).await?;
        let timeline = resp
            .timelines
            .as_ref()
            .ok_or_else(|| BackendError::Decode("directs response has no timeline".into()))?;
        let username = resp
            .roster
            .username(&timeline.user)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BackendError::Decode("timeline owner missing from roster".into()))?;

        Ok(Credential {
            username: username.to_string(),
            access_token: token.to_string(),
            feed_handle: timeline.id.clone(),
        })
    }

    async fn fetch_direct_posts(&self, credential: &Credential) -> Result<Vec<Post>> {
        let resp: DirectsResponse = self
            .call(&credential.access_token, Method::GET, DIRECTS_PATH, None)
            .await?;
        Ok(resp.all_posts())
    }

    async fn fetch_post(&self, credential: &Credential, post_id: &str) -> Result<Post> {
        let path = format!("/v2/posts/{}", utf8_percent_encode(post_id, PATH_SEGMENT));
        let resp: OnePostResponse = self
            .call(&credential.access_token, Method::GET, &path, None)
            .await?;
        Ok(resp.post())
    }

    async fn submit_post(
        &self,
        credential: &Credential,
        addressees: &[String],
        body: &str,
    ) -> Result<String> {
        let request = NewPostRequest {
            meta: NewPostMeta {
                feeds: addressees.to_vec(),
            },
            post: NewPostBody {
                body: body.to_string(),
            },
        };
        let created: PostCreated = self
            .call(
                &credential.access_token,
                Method::POST,
                "/v1/posts",
                Some(Self::encode(&request)?),
            )
            .await?;
        Ok(created.posts.id)
    }

    async fn submit_comment(
        &self,
        credential: &Credential,
        post_id: &str,
        body: &str,
    ) -> Result<()> {
        let request = NewCommentRequest {
            comment: NewCommentBody {
                body: body.to_string(),
                post_id: post_id.to_string(),
            },
        };
        let _ = self
            .send(
                &credential.access_token,
                Method::POST,
                "/v1/comments",
                Some(Self::encode(&request)?),
            )
            .await?;
        Ok(())
    }

    async fn fetch_contacts(&self, credential: &Credential) -> Result<Vec<String>> {
        let resp: WhoAmIResponse = self
            .call(
                &credential.access_token,
                Method::GET,
                "/v2/users/whoami",
                None,
            )
            .await?;
        Ok(resp.mutual_contacts())
    }
}
