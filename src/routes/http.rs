//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::CATEGORY_POOL;
use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// `QuizError` rendered as `{kind, message}` with a matching status.
pub struct ApiError(pub QuizError);

impl From<QuizError> for ApiError {
  fn from(e: QuizError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match self.0 {
      QuizError::Validation(_) => StatusCode::BAD_REQUEST,
      QuizError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
      QuizError::Busy => StatusCode::CONFLICT,
      QuizError::Network { .. } | QuizError::Parse(_) => StatusCode::BAD_GATEWAY,
      QuizError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorOut::from(&self.0))).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation_enabled: state.generation_enabled })
}

#[instrument(level = "info")]
pub async fn http_categories() -> impl IntoResponse {
  Json(CategoriesOut { categories: CATEGORY_POOL.to_vec() })
}

#[instrument(level = "info", skip(state, body), fields(category = %body.category))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateQuizIn>,
) -> Result<impl IntoResponse, ApiError> {
  match create_user_quiz(&state, &body.category).await {
    Ok(quiz) => {
      info!(target: "quiz", id = %quiz.id, questions = quiz.question_count(), "HTTP quiz created");
      Ok(Json(quiz))
    }
    Err(e) => {
      warn!(target: "quiz", kind = e.kind(), error = %e, "HTTP quiz request refused");
      Err(e.into())
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_daily(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let levels = load_daily_levels(&state).await?;
  info!(target: "quiz", levels = levels.len(), "HTTP daily levels served");
  Ok(Json(LevelsOut { levels }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_generation(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let snapshot = state.orchestrator.snapshot().await;
  let cooldown_minutes = state.orchestrator.cooldown_remaining().await;
  Json(GenerationOut { state: snapshot, cooldown_minutes })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_generation_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.orchestrator.reset().await;
  Json(GenerationOut {
    state: state.orchestrator.snapshot().await,
    cooldown_minutes: state.orchestrator.cooldown_remaining().await,
  })
}

#[instrument(level = "info", skip(state, body), fields(id = %body.quiz.id))]
pub async fn http_put_current(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CurrentQuizIn>,
) -> impl IntoResponse {
  set_current_quiz(&state, &body.quiz);
  StatusCode::NO_CONTENT
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_current(State(state): State<Arc<AppState>>) -> Response {
  match current_quiz(&state) {
    Some(quiz) => Json(quiz).into_response(),
    None => StatusCode::NOT_FOUND.into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_current(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.cache().clear_current_quiz();
  StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::{to_bytes, Body};
  use axum::http::{Method, Request};
  use axum::Router;
  use tower::ServiceExt;

  use crate::clock::Clock;
  use crate::config::AppConfig;
  use crate::domain::Quiz;
  use crate::routes::build_router;
  use crate::storage::MemoryStore;
  use crate::testing::{quiz_json, sample_quiz, ManualClock, ScriptedGenerator};

  fn router(script: ScriptedGenerator) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_noon());
    let state = AppState::with_parts(Arc::new(script), Arc::new(MemoryStore::new()), clock, AppConfig::default());
    build_router(Arc::new(state))
  }

  async fn call(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        req = req.header("content-type", "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
  }

  #[tokio::test]
  async fn health_and_categories() {
    let app = router(ScriptedGenerator::default());
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["ok"], true);

    let (_, body) = call(&app, Method::GET, "/api/v1/categories", None).await;
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["categories"].as_array().unwrap().len(), 10);
  }

  #[tokio::test]
  async fn empty_category_is_bad_request() {
    let app = router(ScriptedGenerator::default());
    let (status, body) = call(&app, Method::POST, "/api/v1/quiz", Some(serde_json::json!({ "category": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorOut = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.kind, "validation");
    assert_eq!(err.message, "Please select a category");
  }

  #[tokio::test]
  async fn second_quiz_inside_cooldown_is_rate_limited() {
    let app = router(ScriptedGenerator::new([Ok(quiz_json("Rivers", 5))]));
    let (status, body) = call(&app, Method::POST, "/api/v1/quiz", Some(serde_json::json!({ "category": "Geography" }))).await;
    assert_eq!(status, StatusCode::OK);
    let quiz: Quiz = serde_json::from_slice(&body).unwrap();
    assert_eq!(quiz.category, "Geography");
    assert_eq!(quiz.questions.len(), 5);

    let (status, body) = call(&app, Method::POST, "/api/v1/quiz", Some(serde_json::json!({ "category": "Geography" }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let err: ErrorOut = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.kind, "rate_limited");
    assert_eq!(err.minutes_remaining, Some(10));

    let (_, body) = call(&app, Method::GET, "/api/v1/generation", None).await;
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["phase"], "done");
    assert_eq!(v["cooldownMinutes"], 10);
  }

  #[tokio::test]
  async fn model_failure_is_bad_gateway() {
    let app = router(ScriptedGenerator::new([Ok("I cannot help with that".to_string())]));
    let (status, body) = call(&app, Method::POST, "/api/v1/quiz", Some(serde_json::json!({ "category": "Sports" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let err: ErrorOut = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.message, "Failed to generate quiz. Please try again later.");
  }

  #[tokio::test]
  async fn current_quiz_hand_off() {
    let app = router(ScriptedGenerator::default());
    let (status, _) = call(&app, Method::GET, "/api/v1/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let quiz = sample_quiz("Art & Culture", 4);
    let (status, _) = call(&app, Method::PUT, "/api/v1/current", Some(serde_json::json!({ "quiz": quiz }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, "/api/v1/current", None).await;
    assert_eq!(status, StatusCode::OK);
    let back: Quiz = serde_json::from_slice(&body).unwrap();
    assert_eq!(back, quiz);

    let (status, _) = call(&app, Method::DELETE, "/api/v1/current", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, "/api/v1/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn daily_levels_over_http() {
    let script = ScriptedGenerator::new((0..3).map(|i| Ok(quiz_json(&format!("Daily {i}"), 10))));
    let app = router(script);
    let (status, body) = call(&app, Method::GET, "/api/v1/daily", None).await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let levels = v["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0]["title"], "Level 1");
    assert_eq!(levels[0]["quizzes"].as_array().unwrap().len(), 3);
  }
}
