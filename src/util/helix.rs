use core::fmt;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::constants::{
    GAMES_BATCH_SIZE, REQUEST_TIMEOUT_SECS, STREAMS_PAGE_SIZE, USERS_BATCH_SIZE,
};

/// App access token obtained through the client-credentials grant. Scoped to
/// a single request's lifetime; never cached across requests.
#[derive(Debug, Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Seam for token acquisition so a caching decorator can be layered in
/// without touching any of the Helix consumers.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn app_token(&self) -> HelixResult<BearerToken>;
}

/// Client-credentials exchanger against the Twitch OAuth endpoint.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    client: reqwest::Client,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl AppCredentials {
    pub fn new(
        oauth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> HelixResult<Self> {
        Ok(Self {
            client: default_client()?,
            oauth_url: oauth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl TokenProvider for AppCredentials {
    #[instrument(skip(self))]
    async fn app_token(&self) -> HelixResult<BearerToken> {
        let res = self
            .client
            .post(&self.oauth_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(code = %status, body, "credential exchange rejected");
            return Err(HelixErr::Auth { body });
        }

        let parsed = res.json::<TokenResponse>().await?;
        tracing::debug!("acquired app access token");
        Ok(BearerToken(parsed.access_token))
    }
}

/// Thin client over the Helix REST surface. The base URL is injected so
/// tests can point it at a local mock listener.
#[derive(Debug, Clone)]
pub struct HelixClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl HelixClient {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> HelixResult<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: base_url.into(),
            client_id: client_id.into(),
        })
    }

    #[instrument(skip(self, token))]
    async fn fetch<T>(&self, token: &BearerToken, path_and_query: &str) -> HelixResult<T>
    where
        T: DeserializeOwned + fmt::Debug,
    {
        let uri = format!("{}/{}", self.base_url, path_and_query);
        let res = self
            .client
            .get(uri)
            .bearer_auth(token.as_str())
            .header("Client-Id", &self.client_id)
            .send()
            .await?;

        if !res.status().is_success() {
            let status_code = res.status();
            tracing::error!(code = %status_code, "non-success helix response");

            // surface whatever diagnostic detail the response body carries
            return Err(match res.json::<Value>().await {
                Ok(body) => HelixErr::FetchWithBody { body },
                Err(_) => HelixErr::Fetch(status_code.to_string()),
            });
        }

        let rl_remaining = res.headers().get("ratelimit-remaining");
        let rl_total = res.headers().get("ratelimit-limit");
        if let Some(remaining) = rl_remaining
            && let Some(total) = rl_total
        {
            tracing::debug!(ratelimit_available = ?remaining, ratelimit_total = ?total, "rate-limit bucket");
        }

        Ok(res.json::<T>().await?)
    }

    /// Walks the live-streams listing for one language, following the
    /// pagination cursor for up to `max_pages` pages of 100 records.
    ///
    /// A failed page terminates collection with whatever was already
    /// gathered; `pages_fetched` records how far the walk actually got.
    #[instrument(skip(self, token))]
    pub async fn collect_streams(
        &self,
        token: &BearerToken,
        language: &str,
        max_pages: usize,
    ) -> StreamCollection {
        let mut records: Vec<StreamRecord> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0;

        for _ in 0..max_pages {
            let mut path = format!("streams?language={language}&first={STREAMS_PAGE_SIZE}");
            if let Some(after) = &cursor {
                path.push_str(&format!("&after={after}"));
            }

            let page = match self.fetch::<HelixPage<StreamRecord>>(token, &path).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = ?e, pages_fetched, "page fetch failed, truncating collection");
                    break;
                }
            };

            pages_fetched += 1;
            records.extend(page.data);
            cursor = page.pagination.and_then(|p| p.cursor);
            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!(
            record_count = records.len(),
            pages_fetched,
            "stream collection complete"
        );

        StreamCollection {
            records,
            pages_fetched,
        }
    }

    /// Batched user lookup by login. Load-bearing for enrichment, so any
    /// failure here propagates instead of degrading.
    #[instrument(skip(self, token), fields(login_count = logins.len()))]
    pub async fn users_by_login(
        &self,
        token: &BearerToken,
        logins: &[String],
    ) -> HelixResult<Vec<HelixUser>> {
        let mut retrieved = Vec::new();

        for param in chunked_query("login", logins, USERS_BATCH_SIZE) {
            let path = format!("users{param}");
            let page = self.fetch::<HelixPage<HelixUser>>(token, &path).await?;
            retrieved.extend(page.data);
        }

        tracing::debug!(fetched_count = retrieved.len(), "fetched user records");
        Ok(retrieved)
    }

    /// Follower total for one user (`total` field of a single-entry follows
    /// page). `None` when the upstream omits the field.
    #[instrument(skip(self, token))]
    pub async fn follower_total(
        &self,
        token: &BearerToken,
        user_id: &str,
    ) -> HelixResult<Option<i64>> {
        let path = format!("users/follows?to_id={user_id}&first=1");
        let page = self.fetch::<FollowsPage>(token, &path).await?;
        Ok(page.total)
    }

    /// Current live stream for one user, if any. First record wins.
    #[instrument(skip(self, token))]
    pub async fn live_stream(
        &self,
        token: &BearerToken,
        user_id: &str,
    ) -> HelixResult<Option<StreamRecord>> {
        let path = format!("streams?user_id={user_id}");
        let page = self.fetch::<HelixPage<StreamRecord>>(token, &path).await?;
        Ok(page.data.into_iter().next())
    }

    /// Resolves game ids to display names in batches of 50. A failed batch is
    /// skipped; unresolved ids are simply absent from the returned map.
    #[instrument(skip(self, token), fields(id_count = ids.len()))]
    pub async fn game_names(
        &self,
        token: &BearerToken,
        ids: &[String],
    ) -> HashMap<String, String> {
        let mut names = HashMap::new();

        for param in chunked_query("id", ids, GAMES_BATCH_SIZE) {
            let path = format!("games{param}");
            match self.fetch::<HelixPage<HelixGame>>(token, &path).await {
                Ok(page) => {
                    for game in page.data {
                        names.insert(game.id, game.name);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "game metadata batch failed, ids keep their raw form");
                }
            }
        }

        names
    }
}

/// Builds `?key=a&key=b` query strings, one per chunk of `chunk_size` items.
fn chunked_query(key: &str, items: &[String], chunk_size: usize) -> Vec<String> {
    items
        .chunks(chunk_size)
        .map(|chunk| {
            let mut query = format!("?{key}={}", chunk[0]);
            for val in &chunk[1..] {
                query.push_str(&format!("&{key}={val}"));
            }
            query
        })
        .collect()
}

fn default_client() -> HelixResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowsPage {
    #[serde(default)]
    pub total: Option<i64>,
}

/// One live-stream record as returned by `/streams`. Read-only; lives for a
/// single request.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixGame {
    pub id: String,
    pub name: String,
}

/// Streams gathered by [`HelixClient::collect_streams`] plus the page count
/// diagnostic (silent truncation would otherwise be invisible).
#[derive(Debug, Clone)]
pub struct StreamCollection {
    pub records: Vec<StreamRecord>,
    pub pages_fetched: usize,
}

pub type HelixResult<T> = core::result::Result<T, HelixErr>;

#[derive(Debug, Error)]
pub enum HelixErr {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("credential exchange rejected: {body}")]
    Auth { body: String },

    #[error("error during helix fetch: {0}")]
    Fetch(String),

    #[error("error (with detail) during helix fetch: {:#?}", body)]
    FetchWithBody { body: Value },
}

impl HelixErr {
    /// Upstream diagnostic body, where one was captured.
    pub fn upstream_body(&self) -> Option<String> {
        match self {
            HelixErr::Auth { body } => Some(body.clone()),
            HelixErr::FetchWithBody { body } => Some(body.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chunked_query_splits_on_batch_size() {
        let items: Vec<String> = (0..120).map(|i| format!("user{i}")).collect();
        let params = chunked_query("login", &items, 100);

        assert_eq!(params.len(), 2);
        assert!(params[0].starts_with("?login=user0&login=user1"));
        assert!(params[1].starts_with("?login=user100"));
        assert_eq!(params[1].matches("login=").count(), 20);
    }

    #[test]
    fn stream_record_defaults_missing_fields() {
        let record: StreamRecord =
            serde_json::from_str(r#"{"user_login":"abc","title":"t"}"#).unwrap();
        assert_eq!(record.viewer_count, 0);
        assert!(record.game_id.is_empty());
    }
}
