use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{GameAggregate, TopStream};
use crate::enrich::ChannelDetail;

/// Full dashboard payload. Field names are the dashboard's wire contract;
/// `competitors` is a BTreeMap so repeated fetches of the same upstream data
/// serialize byte-identically (modulo `fetched_at`).
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub fetched_at: String,
    #[serde(rename = "totalViewers")]
    pub total_viewers: u64,
    #[serde(rename = "topStreams")]
    pub top_streams: Vec<TopStream>,
    #[serde(rename = "topGames")]
    pub top_games: Vec<GameAggregate>,
    pub competitors: BTreeMap<String, Option<ChannelDetail>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginsQuery {
    #[serde(default)]
    pub logins: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompetitorsQuery {
    #[serde(default)]
    pub competitors: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(rename = "userQuery", default)]
    pub user_query: Option<String>,
    #[serde(rename = "systemPrompt", default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
}
