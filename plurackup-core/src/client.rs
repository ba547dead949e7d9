//! reqwest-backed [`PlurkApi`] implementation.
//!
//! Every call is a form-encoded POST carrying the application `api_key`. Login
//! goes to the secured base URL and seeds the client's cookie store; later calls
//! reuse that session cookie implicitly. 4xx answers carry a JSON `error_text`
//! and are decoded like any other body; other failures are transport errors.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ApiConfig;
use crate::contract::{LoginOutcome, PlurkApi, PostsPage, RepliesOutcome, RepliesPage};
use crate::error::ClientError;
use crate::model::{parse_server_time, Audience, Identity, IdentityDirectory, Post, Reply};

const LOGIN_PATH: &str = "/API/Users/login";
const LOGOUT_PATH: &str = "/API/Users/logout";
const TIMELINE_PATH: &str = "/API/Timeline/getPlurks";
const RESPONSES_PATH: &str = "/API/Responses/get";

/// Timeline cutoff format expected by `getPlurks`.
pub const OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct PlurkClient {
    http: Client,
    api_key: String,
    secure_base_url: String,
    plain_base_url: String,
}

impl PlurkClient {
    pub fn new(api_key: impl Into<String>, api: &ApiConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("plurackup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            secure_base_url = %api.secure_base_url,
            plain_base_url = %api.plain_base_url,
            "Initialized PlurkClient"
        );
        Ok(Self {
            http,
            api_key: api_key.into(),
            secure_base_url: api.secure_base_url.trim_end_matches('/').to_string(),
            plain_base_url: api.plain_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
        secure: bool,
    ) -> Result<Value, ClientError> {
        params.push(("api_key", self.api_key.clone()));
        let base = if secure {
            &self.secure_base_url
        } else {
            &self.plain_base_url
        };
        let url = format!("{base}{path}");
        debug!(url = %url, "POST");

        let response = self.http.post(&url).form(&params).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Request failed");
            ClientError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() && !status.is_client_error() {
            error!(status = %status, url = %url, "Unexpected HTTP status");
            return Err(ClientError::Status { status, url });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PlurkApi for PlurkClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let params = vec![
            ("username", username.to_string()),
            ("password", password.to_string()),
        ];
        let body = self.call(LOGIN_PATH, params, true).await?;
        decode_login(body, username)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.call(LOGOUT_PATH, Vec::new(), false).await?;
        Ok(())
    }

    async fn fetch_own_posts(
        &self,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<PostsPage, ClientError> {
        let params = vec![
            ("offset", before.format(OFFSET_FORMAT).to_string()),
            ("limit", limit.to_string()),
            ("only_user", "yes".to_string()),
            ("favorers_detail", "true".to_string()),
            ("limited_detail", "true".to_string()),
            ("replurkers_detail", "true".to_string()),
        ];
        let body = self.call(TIMELINE_PATH, params, false).await?;
        decode_posts_page(body)
    }

    async fn fetch_replies(
        &self,
        plurk_id: i64,
        from_response: u32,
    ) -> Result<RepliesOutcome, ClientError> {
        let params = vec![
            ("plurk_id", plurk_id.to_string()),
            ("from_response", from_response.to_string()),
        ];
        let body = self.call(RESPONSES_PATH, params, false).await?;
        Ok(decode_replies(body))
    }
}

// Wire payloads

/// Either `[]` (nobody) or an object keyed by stringified id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfilesPayload {
    Map(HashMap<String, WireProfile>),
    Empty(#[allow(dead_code)] Vec<IgnoredAny>),
}

impl Default for ProfilesPayload {
    fn default() -> Self {
        ProfilesPayload::Empty(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct WireProfile {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    uid: Option<i64>,
    #[serde(default)]
    nick_name: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl From<ProfilesPayload> for IdentityDirectory {
    fn from(payload: ProfilesPayload) -> Self {
        match payload {
            ProfilesPayload::Empty(_) => IdentityDirectory::new(),
            ProfilesPayload::Map(map) => map
                .into_iter()
                .filter_map(|(key, profile)| {
                    if profile.nick_name.is_empty() {
                        warn!(key = %key, "Skipping profile without a nick name");
                        return None;
                    }
                    let id = profile.id.or(profile.uid).or_else(|| key.parse().ok())?;
                    Some((id, Identity::new(profile.nick_name, profile.display_name)))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WirePost {
    plurk_id: i64,
    posted: String,
    lang: String,
    qualifier: String,
    #[serde(default)]
    qualifier_translated: Option<String>,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    favorers: Vec<i64>,
    #[serde(default)]
    replurkers_count: u64,
    #[serde(default)]
    replurkers: Vec<i64>,
    #[serde(default)]
    limited_to: Option<String>,
    content_raw: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WirePostsPage {
    #[serde(default)]
    plurks: Vec<WirePost>,
    #[serde(default)]
    plurk_users: ProfilesPayload,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    id: i64,
    user_id: i64,
    posted: String,
    lang: String,
    qualifier: String,
    #[serde(default)]
    qualifier_translated: Option<String>,
    content_raw: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireRepliesPage {
    responses: Vec<WireReply>,
    #[serde(default)]
    friends: ProfilesPayload,
}

#[derive(Debug, Deserialize)]
struct WireLogin {
    #[serde(default)]
    user_info: Option<WireOwner>,
}

#[derive(Debug, Deserialize)]
struct WireOwner {
    #[serde(default)]
    nick_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

fn error_text(body: &Value) -> Option<String> {
    body.get("error_text")
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
}

fn from_value<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(body)?)
}

fn posted_at(raw: &str) -> Result<DateTime<Utc>, ClientError> {
    parse_server_time(raw).map_err(|source| ClientError::Timestamp {
        raw: raw.to_string(),
        source,
    })
}

fn decode_login(body: Value, username: &str) -> Result<LoginOutcome, ClientError> {
    if let Some(text) = error_text(&body) {
        return Ok(LoginOutcome::Rejected(text));
    }
    let login: WireLogin = from_value(body)?;
    let owner = login.user_info.unwrap_or(WireOwner {
        nick_name: None,
        display_name: None,
    });
    let handle = owner.nick_name.unwrap_or_else(|| username.to_string());
    Ok(LoginOutcome::Authenticated(Identity::new(
        handle,
        owner.display_name,
    )))
}

/// A body without `plurks` decodes as an empty page, which ends pagination.
fn decode_posts_page(body: Value) -> Result<PostsPage, ClientError> {
    let page: WirePostsPage = from_value(body)?;
    let posts = page
        .plurks
        .into_iter()
        .map(|wire| {
            Ok(Post {
                id: wire.plurk_id,
                posted: posted_at(&wire.posted)?,
                lang: wire.lang,
                qualifier_translated: wire
                    .qualifier_translated
                    .unwrap_or_else(|| wire.qualifier.clone()),
                qualifier: wire.qualifier,
                content_raw: wire.content_raw,
                content: wire.content,
                favorite_count: wire.favorite_count,
                favorers: wire.favorers,
                replurkers_count: wire.replurkers_count,
                replurkers: wire.replurkers,
                audience: Audience::parse_limited_to(wire.limited_to.as_deref()),
                replies: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;
    Ok(PostsPage {
        posts,
        identities: page.plurk_users.into(),
    })
}

/// Anything other than a decodable `responses` list is reported as malformed.
fn decode_replies(body: Value) -> RepliesOutcome {
    if body.get("responses").is_none() {
        let reason = error_text(&body).unwrap_or_else(|| "missing responses".to_string());
        return RepliesOutcome::Malformed(reason);
    }
    let page: WireRepliesPage = match serde_json::from_value(body) {
        Ok(page) => page,
        Err(e) => return RepliesOutcome::Malformed(e.to_string()),
    };
    let mut replies = Vec::with_capacity(page.responses.len());
    for wire in page.responses {
        let posted = match posted_at(&wire.posted) {
            Ok(t) => t,
            Err(e) => return RepliesOutcome::Malformed(e.to_string()),
        };
        replies.push(Reply {
            id: wire.id,
            author: wire.user_id,
            posted,
            lang: wire.lang,
            qualifier_translated: wire
                .qualifier_translated
                .unwrap_or_else(|| wire.qualifier.clone()),
            qualifier: wire.qualifier,
            content_raw: wire.content_raw,
            content: wire.content,
        });
    }
    RepliesOutcome::Replies(RepliesPage {
        replies,
        identities: page.friends.into(),
    })
}
