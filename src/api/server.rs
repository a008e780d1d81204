use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::constants::{API_GEMINI_URL, API_HELIX_URL, API_OAUTH_URL};
use crate::util::env::Env;
use crate::util::gemini::{GeminiClient, GeminiErr};
use crate::util::helix::{AppCredentials, HelixClient, HelixErr, TokenProvider};

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub helix: HelixClient,
    pub gemini: GeminiClient,
    pub tokens: Arc<dyn TokenProvider>,
    pub gemini_api_key: Option<String>,
}

/// Upstream base URLs, separated from `Env` so tests can aim the clients at
/// local mock listeners.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub helix: String,
    pub oauth: String,
    pub gemini: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            helix: API_HELIX_URL.to_string(),
            oauth: API_OAUTH_URL.to_string(),
            gemini: API_GEMINI_URL.to_string(),
        }
    }
}

impl AppState {
    pub fn new(env: &Env, endpoints: Endpoints) -> Result<Self, RouteError> {
        Ok(Self {
            helix: HelixClient::new(&endpoints.helix, &env.client_id)?,
            gemini: GeminiClient::new(&endpoints.gemini)?,
            tokens: Arc::new(AppCredentials::new(
                &endpoints.oauth,
                &env.client_id,
                &env.client_secret,
            )?),
            gemini_api_key: env.gemini_api_key.clone(),
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/twitch", get(twitch_channels))
        .route("/twitch-stats", get(twitch_stats))
        .route("/gemini", post(gemini_proxy))
        .route("/checkhealth", get(|| async { "SERVER_OK" }))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(Any),
        )
        .with_state(state)
}

/// Custom error trace handler for `RouteError`-type responses.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("missing '{0}'")]
    MissingParam(&'static str),

    #[error("server not configured: {0}")]
    Config(String),

    #[error(transparent)]
    HelixError(#[from] HelixErr),

    #[error(transparent)]
    GeminiError(#[from] GeminiErr),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error, details) = match &self {
            RouteError::MissingParam(param) => (
                StatusCode::BAD_REQUEST,
                format!("Missing {param}"),
                None,
            ),

            RouteError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),

            RouteError::HelixError(helix_err) => match helix_err {
                HelixErr::Auth { body } => (
                    StatusCode::BAD_GATEWAY,
                    String::from("Auth failed"),
                    Some(body.clone()),
                ),

                HelixErr::Fetch(_) | HelixErr::FetchWithBody { .. } => (
                    StatusCode::BAD_GATEWAY,
                    String::from("Upstream request failed"),
                    helix_err.upstream_body(),
                ),

                // transport-level failure, nothing upstream to attach
                HelixErr::ReqwestError(error) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error.to_string(),
                    None,
                ),
            },

            RouteError::GeminiError(gemini_err) => match gemini_err {
                GeminiErr::Upstream { body } => (
                    StatusCode::BAD_GATEWAY,
                    String::from("Gemini API error"),
                    Some(body.clone()),
                ),

                GeminiErr::ReqwestError(error) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error.to_string(),
                    None,
                ),
            },
        };

        let mut res = (status, Json(ErrorResponse { error, details })).into_response();
        res.extensions_mut().insert(Arc::new(self));
        res
    }
}
