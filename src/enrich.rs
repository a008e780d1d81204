use std::collections::{BTreeMap, HashMap};

use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::instrument;

use crate::constants::{CHANNEL_URL_BASE, MAX_ENRICH_CONCURRENCY};
use crate::util::helix::{BearerToken, HelixClient, HelixResult, HelixUser};

/// Resolved per-channel detail. `followers` and `viewer_count` degrade to
/// `null` when their sub-lookup fails; `live` and `profile_image_url` are
/// variant-specific and dropped from the JSON entirely when unset.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelDetail {
    pub id: String,
    pub display_name: String,
    pub followers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<bool>,
    pub viewer_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnrichVariant {
    /// Bare enrichment endpoint: carries the live flag, no profile image.
    Lightweight,
    /// Dashboard stats endpoint: carries the profile image, no live flag.
    Stats,
}

/// Splits a comma-separated login list, trimming, lowercasing, and dropping
/// empty segments.
pub fn normalize_logins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Enriches each requested login with platform detail.
///
/// One batched user lookup builds the login index; a failure there is
/// load-bearing and propagates. Per-login enrichment then fans out with
/// bounded concurrency, each task running its follower and live lookups
/// concurrently and degrading a failed lookup to `null` for that field only.
///
/// Every login appears in the returned map exactly once, lowercased;
/// unresolved logins map to `None`.
#[instrument(skip(helix, token), fields(login_count = logins.len()))]
pub async fn enrich_channels(
    helix: &HelixClient,
    token: &BearerToken,
    logins: &[String],
    variant: EnrichVariant,
) -> HelixResult<BTreeMap<String, Option<ChannelDetail>>> {
    if logins.is_empty() {
        return Ok(BTreeMap::new());
    }

    let users = helix.users_by_login(token, logins).await?;
    let index: HashMap<String, HelixUser> = users
        .into_iter()
        .map(|u| (u.login.to_lowercase(), u))
        .collect();

    // map keys are unique, so duplicate logins collapse; fan out over the
    // deduplicated set rather than re-fetching the same channel twice
    let mut keys: Vec<String> = logins.to_vec();
    keys.sort();
    keys.dedup();

    let tasks = keys.into_iter().map(|login| {
        let user = index.get(&login).cloned();
        async move {
            let detail = match user {
                Some(user) => Some(enrich_one(helix, token, &user, variant).await),
                None => {
                    tracing::debug!(login, "login did not resolve to a platform user");
                    None
                }
            };
            (login, detail)
        }
    });

    let resolved: Vec<(String, Option<ChannelDetail>)> = stream::iter(tasks)
        .buffer_unordered(MAX_ENRICH_CONCURRENCY)
        .collect()
        .await;

    Ok(resolved.into_iter().collect())
}

async fn enrich_one(
    helix: &HelixClient,
    token: &BearerToken,
    user: &HelixUser,
    variant: EnrichVariant,
) -> ChannelDetail {
    let (followers, live_stream) = tokio::join!(
        helix.follower_total(token, &user.id),
        helix.live_stream(token, &user.id),
    );

    let followers = match followers {
        Ok(total) => total,
        Err(e) => {
            tracing::warn!(login = user.login, error = ?e, "follower lookup degraded to null");
            None
        }
    };

    let live_stream = match live_stream {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(login = user.login, error = ?e, "live-stream lookup degraded to offline");
            None
        }
    };

    let viewer_count = live_stream.as_ref().map(|s| s.viewer_count);

    ChannelDetail {
        id: user.id.clone(),
        display_name: user.display_name.clone(),
        followers,
        live: match variant {
            EnrichVariant::Lightweight => Some(live_stream.is_some()),
            EnrichVariant::Stats => None,
        },
        viewer_count,
        profile_image_url: match variant {
            EnrichVariant::Lightweight => None,
            EnrichVariant::Stats => Some(user.profile_image_url.clone()),
        },
        url: format!("{CHANNEL_URL_BASE}/{}", user.login),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_lowercases_trims_and_drops_empties() {
        let logins = normalize_logins(" Foo, BAR ,,baz,");
        assert_eq!(logins, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn normalize_of_empty_input_is_empty() {
        assert!(normalize_logins("").is_empty());
        assert!(normalize_logins(" , ,").is_empty());
    }

    #[test]
    fn variant_fields_skipped_when_unset() {
        let detail = ChannelDetail {
            id: "1".into(),
            display_name: "Foo".into(),
            followers: Some(100),
            live: Some(false),
            viewer_count: None,
            profile_image_url: None,
            url: "https://twitch.tv/foo".into(),
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["live"], serde_json::json!(false));
        assert_eq!(json["viewer_count"], serde_json::Value::Null);
        assert!(json.get("profile_image_url").is_none());
    }
}
