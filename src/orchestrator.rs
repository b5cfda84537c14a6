//! Generation orchestrator: single-flight gating, the user cooldown, and the
//! transient state the UI renders (phase, last result, last error).
//!
//! All dependencies are injected (generator, cache, clock), so there is no
//! ambient mutable state. Locks are never held across the model call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::Limits;
use crate::domain::{DailyQuizLevel, Quiz};
use crate::error::QuizError;
use crate::generator::QuizGenerator;
use crate::levels::build_levels;
use crate::storage::{is_fresh, LocalCache};

const MINUTE_MS: i64 = 60_000;
const DAILY_FAILURE_MESSAGE: &str = "Failed to generate daily quizzes. Please try again later.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
  Idle,
  InFlight,
  Done,
  Failed,
}

/// Snapshot of what the UI shows about generation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
  pub phase: GenerationPhase,
  pub last_generated_at: Option<DateTime<Utc>>,
  pub quiz: Option<Quiz>,
  pub quizzes: Vec<Quiz>,
  pub error: Option<String>,
}

impl GenerationState {
  pub fn in_progress(&self) -> bool { self.phase == GenerationPhase::InFlight }
}

struct Inner {
  state: GenerationState,
  /// Bumped by `reset`; a generation finishing under an older epoch leaves state alone.
  epoch: u64,
}

pub struct Orchestrator {
  generator: QuizGenerator,
  cache: LocalCache,
  clock: Arc<dyn Clock>,
  limits: Limits,
  inner: RwLock<Inner>,
}

impl Orchestrator {
  pub fn new(generator: QuizGenerator, cache: LocalCache, clock: Arc<dyn Clock>, limits: Limits) -> Self {
    let last_generated_at = cache.load_last_generated_at();
    if let Some(ts) = last_generated_at {
      debug!(target: "quiz", %ts, "Restored last user generation time");
    }
    Self {
      generator,
      cache,
      clock,
      limits,
      inner: RwLock::new(Inner {
        state: GenerationState {
          phase: GenerationPhase::Idle,
          last_generated_at,
          quiz: None,
          quizzes: Vec::new(),
          error: None,
        },
        epoch: 0,
      }),
    }
  }

  pub fn cache(&self) -> &LocalCache { &self.cache }

  pub async fn snapshot(&self) -> GenerationState {
    self.inner.read().await.state.clone()
  }

  /// Minutes until the cooldown allows another user generation; `None` when allowed now.
  pub async fn cooldown_remaining(&self) -> Option<u64> {
    let last = self.inner.read().await.state.last_generated_at;
    self.minutes_remaining(last)
  }

  /// Generate a quiz for the user on `category`, subject to the cooldown.
  #[instrument(level = "info", skip(self))]
  pub async fn request_user_quiz(&self, category: &str) -> Result<Quiz, QuizError> {
    let category = category.trim();
    let epoch = {
      let mut inner = self.inner.write().await;
      // Nothing may touch the state while a generation owns it.
      if inner.state.in_progress() {
        warn!(target: "quiz", %category, "Rejected user generation: another one is in flight");
        return Err(QuizError::Busy);
      }
      if category.is_empty() {
        let err = QuizError::Validation("category must not be empty".into());
        inner.state.error = Some(err.user_message());
        return Err(err);
      }
      if let Some(minutes_remaining) = self.minutes_remaining(inner.state.last_generated_at) {
        let err = QuizError::RateLimited { minutes_remaining };
        inner.state.error = Some(err.user_message());
        info!(target: "quiz", %category, minutes_remaining, "User generation rate limited");
        return Err(err);
      }
      Self::begin(&mut inner)
    };

    let result = self.generator.generate_quiz(category, self.limits.questions_per_quiz).await;

    let mut inner = self.inner.write().await;
    let current = inner.epoch == epoch;
    if !current {
      debug!(target: "quiz", %category, "Generation finished after reset; leaving state untouched");
      inner.state.phase = GenerationPhase::Idle;
    }
    match &result {
      Ok(quiz) => {
        // The upstream call happened either way, so the cooldown still applies.
        let now = self.clock.now().with_timezone(&Utc);
        inner.state.last_generated_at = Some(now);
        self.cache.save_last_generated_at(now);
        if current {
          inner.state.quiz = Some(quiz.clone());
          inner.state.error = None;
          inner.state.phase = GenerationPhase::Done;
        }
        info!(target: "quiz", %category, quiz_id = %quiz.id, "User quiz ready");
      }
      Err(e) => {
        if current {
          inner.state.quiz = None;
          inner.state.quizzes.clear();
          inner.state.error = Some(e.user_message());
          inner.state.phase = GenerationPhase::Failed;
        }
        warn!(target: "quiz", %category, error = %e, "User quiz generation failed");
      }
    }
    result
  }

  /// Generate the daily batch. Not rate limited, but shares the single-flight guard.
  #[instrument(level = "info", skip(self))]
  pub async fn request_daily_quizzes(&self) -> Result<Vec<Quiz>, QuizError> {
    let epoch = {
      let mut inner = self.inner.write().await;
      if inner.state.in_progress() {
        warn!(target: "quiz", "Rejected daily generation: another one is in flight");
        return Err(QuizError::Busy);
      }
      Self::begin(&mut inner)
    };

    let result = self.generator.generate_daily_quizzes(self.limits.daily_quiz_count).await;

    let mut inner = self.inner.write().await;
    let current = inner.epoch == epoch;
    if !current {
      inner.state.phase = GenerationPhase::Idle;
    }
    match &result {
      Ok(quizzes) => {
        self.cache.save_quizzes(quizzes);
        self.cache.save_generation_timestamp(self.clock.now().with_timezone(&Utc));
        if current {
          inner.state.quizzes = quizzes.clone();
          inner.state.error = None;
          inner.state.phase = GenerationPhase::Done;
        }
      }
      Err(e) => {
        if current {
          inner.state.quiz = None;
          inner.state.quizzes.clear();
          inner.state.error = Some(DAILY_FAILURE_MESSAGE.into());
          inner.state.phase = GenerationPhase::Failed;
        }
        warn!(target: "quiz", error = %e, "Daily quiz generation failed");
      }
    }
    result
  }

  /// Levels for today: served from the cache when it was filled today,
  /// otherwise regenerated and cached.
  #[instrument(level = "info", skip(self))]
  pub async fn daily_levels(&self) -> Result<Vec<DailyQuizLevel>, QuizError> {
    let now = self.clock.now();
    let stored = self.cache.load_quizzes();
    if let Some(first) = stored.first() {
      let stamp = self.cache.load_generation_timestamp().unwrap_or(first.created_at);
      if is_fresh(&stamp, &now) {
        debug!(target: "quiz", count = stored.len(), "Serving cached daily quizzes");
        return Ok(build_levels(&stored, self.limits.quizzes_per_level, stamp));
      }
      info!(target: "quiz", %stamp, "Cached daily quizzes are stale; regenerating");
    }

    let quizzes = self.request_daily_quizzes().await?;
    let stamp = self.cache.load_generation_timestamp().unwrap_or_else(|| now.with_timezone(&Utc));
    Ok(build_levels(&quizzes, self.limits.quizzes_per_level, stamp))
  }

  /// Clear the last result and error. A generation still in flight keeps the
  /// guard but its outcome will no longer be recorded.
  pub async fn reset(&self) {
    let mut inner = self.inner.write().await;
    inner.epoch += 1;
    inner.state.quiz = None;
    inner.state.error = None;
    if !inner.state.in_progress() {
      inner.state.phase = GenerationPhase::Idle;
    }
  }

  fn begin(inner: &mut Inner) -> u64 {
    inner.state.phase = GenerationPhase::InFlight;
    inner.state.quiz = None;
    inner.state.quizzes.clear();
    inner.state.error = None;
    inner.epoch
  }

  fn minutes_remaining(&self, last: Option<DateTime<Utc>>) -> Option<u64> {
    let last = last?;
    let cooldown_ms = i64::try_from(self.limits.cooldown().as_millis()).unwrap_or(i64::MAX);
    let elapsed_ms = (self.clock.now().with_timezone(&Utc) - last).num_milliseconds().max(0);
    if elapsed_ms >= cooldown_ms {
      return None;
    }
    let remaining_ms = cooldown_ms - elapsed_ms;
    Some(((remaining_ms + MINUTE_MS - 1) / MINUTE_MS) as u64)
  }
}
