use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;

use crate::constants::{GEMINI_EMPTY_RESPONSE, REQUEST_TIMEOUT_SECS};

/// Single-shot proxy client for the generative-text API. No aggregation
/// logic; one request in, one text out.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>) -> GeminiResult<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into(),
        })
    }

    #[instrument(skip_all)]
    pub async fn generate(
        &self,
        api_key: &str,
        user_query: &str,
        system_prompt: &str,
    ) -> GeminiResult<String> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": user_query }] }],
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
        });

        let res = self
            .client
            .post(&self.base_url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(code = %status, "generation request rejected");
            return Err(GeminiErr::Upstream { body });
        }

        let data = res.json::<Value>().await?;
        let text = data
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or(GEMINI_EMPTY_RESPONSE)
            .to_string();

        Ok(text)
    }
}

pub type GeminiResult<T> = core::result::Result<T, GeminiErr>;

#[derive(Debug, Error)]
pub enum GeminiErr {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("generation api error: {body}")]
    Upstream { body: String },
}
