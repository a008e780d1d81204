use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{Json, debug_handler};
use chrono::{SecondsFormat, Utc};
use tracing::instrument;

use crate::aggregate::aggregate_streams;
use crate::api::server::{AppState, JsonResult, RouteError};
use crate::api::types::*;
use crate::constants::{STREAMS_LANGUAGE, STREAMS_MAX_PAGES};
use crate::enrich::{ChannelDetail, EnrichVariant, enrich_channels, normalize_logins};

/// `GET /twitch?logins=a,b`: bare channel enrichment.
#[instrument(skip(state))]
#[debug_handler]
pub async fn twitch_channels(
    Query(query): Query<LoginsQuery>,
    State(state): State<Arc<AppState>>,
) -> JsonResult<BTreeMap<String, Option<ChannelDetail>>> {
    let logins = normalize_logins(&query.logins.unwrap_or_default());
    if logins.is_empty() {
        return Err(RouteError::MissingParam("logins"));
    }

    let token = state.tokens.app_token().await?;
    let channels =
        enrich_channels(&state.helix, &token, &logins, EnrichVariant::Lightweight).await?;

    Ok(Json(channels))
}

/// `GET /twitch-stats?competitors=a,b`: the full aggregation pipeline.
#[instrument(skip(state))]
#[debug_handler]
pub async fn twitch_stats(
    Query(query): Query<CompetitorsQuery>,
    State(state): State<Arc<AppState>>,
) -> JsonResult<StatsResponse> {
    let competitors = normalize_logins(&query.competitors.unwrap_or_default());

    let token = state.tokens.app_token().await?;

    let collection = state
        .helix
        .collect_streams(&token, STREAMS_LANGUAGE, STREAMS_MAX_PAGES)
        .await;
    if collection.pages_fetched < STREAMS_MAX_PAGES {
        tracing::debug!(
            pages_fetched = collection.pages_fetched,
            "listing walk stopped early"
        );
    }

    let aggregates = aggregate_streams(&collection.records);
    let top_games = aggregates.resolve_top_games(&state.helix, &token).await;

    // competitor enrichment is best-effort here: a failed user-batch lookup
    // degrades every competitor to null instead of failing the dashboard
    let competitors =
        match enrich_channels(&state.helix, &token, &competitors, EnrichVariant::Stats).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(error = ?e, "competitor enrichment degraded to nulls");
                competitors.into_iter().map(|login| (login, None)).collect()
            }
        };

    Ok(Json(StatsResponse {
        fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        total_viewers: aggregates.total_viewers,
        top_streams: aggregates.top_streams,
        top_games,
        competitors,
    }))
}

/// `POST /gemini`: single-shot generative-text proxy.
#[instrument(skip(state, body))]
#[debug_handler]
pub async fn gemini_proxy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateRequest>,
) -> JsonResult<GenerateResponse> {
    let (Some(user_query), Some(system_prompt)) = (
        body.user_query.filter(|s| !s.is_empty()),
        body.system_prompt.filter(|s| !s.is_empty()),
    ) else {
        return Err(RouteError::MissingParam("userQuery or systemPrompt"));
    };

    let api_key = state
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| RouteError::Config("API key not configured".to_string()))?;

    let text = state
        .gemini
        .generate(api_key, &user_query, &system_prompt)
        .await?;

    Ok(Json(GenerateResponse { text }))
}
