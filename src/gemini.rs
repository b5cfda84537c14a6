//! Minimal Gemini client for our use-case.
//!
//! We only call `models/{model}:generateContent` and read back the first text part.
//! Calls are instrumented and log model name, latency and response size (not contents).
//!
//! NOTE: We never log the API key; it travels as a query parameter only.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::QuizError;
use crate::util::trunc_for_log;

/// Anything that turns a prompt into free-form model text.
/// The generator only depends on this seam, so tests can script responses.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, QuizError>;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());

    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
  }
}

#[async_trait]
impl TextGenerator for Gemini {
  #[instrument(level = "info", skip(self, system, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, QuizError> {
    let req = GenerateContentRequest {
      system_instruction: (!system.is_empty()).then(|| Content { parts: vec![Part { text: system.into() }] }),
      contents: vec![Content { parts: vec![Part { text: prompt.into() }] }],
    };

    let start = std::time::Instant::now();
    let res = self.client.post(self.endpoint())
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "quizly-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await
      .map_err(|e| QuizError::Network { status: None, message: e.without_url().to_string() })?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(status = status.as_u16(), error = %msg, "Gemini request rejected");
      return Err(QuizError::Network { status: Some(status.as_u16()), message: msg });
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| QuizError::Parse(format!("unexpected response envelope: {e}")))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text = body.first_text().ok_or_else(|| QuizError::Parse("no text in response".into()))?;
    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents: Vec<Content>,
}
#[derive(Serialize, Deserialize)]
struct Content { #[serde(default)] parts: Vec<Part> }
#[derive(Serialize, Deserialize)]
struct Part { #[serde(default)] text: String }

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  /// Some proxies echo the request-shaped `contents` array instead of `candidates`.
  #[serde(default)] contents: Vec<Content>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { content: Option<Content> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

impl GenerateContentResponse {
  fn first_text(self) -> Option<String> {
    let from_candidates = self.candidates.into_iter().next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next());
    let part = from_candidates.or_else(|| {
      self.contents.into_iter().next().and_then(|c| c.parts.into_iter().next())
    })?;
    let text = part.text.trim().to_string();
    if text.is_empty() { None } else { Some(text) }
  }
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
