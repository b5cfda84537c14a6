//! Loading app configuration (prompts + limits) from TOML.
//!
//! See `AppConfig`, `Prompts` and `Limits` for expected schema. Every field has a
//! default, so a partial file only overrides what it names.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
}

/// Prompts used by the quiz generator. `{category}` and `{count}` are filled in per request.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You are a quiz author. Respond ONLY with strict JSON.".into(),
      quiz_user_template: r#"Create a quiz about {category} with exactly {count} multiple choice questions.
Format as a JSON object with the following structure:
{
  "title": "A catchy title for the quiz",
  "description": "A brief description of the quiz",
  "questions": [
    {
      "question": "The question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": "The correct option exactly as written in the options array",
      "explanation": "A brief explanation of why this answer is correct"
    }
  ]
}

Make sure:
- The title is engaging and specific to the {category} category
- Each question has exactly 4 options
- The correct answer is exactly the same as one of the options
- The questions are diverse and interesting
- All information is factually accurate
- Return ONLY the JSON with no additional text"#
        .into(),
    }
  }
}

/// Tunables for generation, grouping and play.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Minimum gap between two user-triggered generations.
  pub cooldown_secs: u64,
  pub questions_per_quiz: usize,
  pub daily_quiz_count: usize,
  pub questions_per_daily_quiz: usize,
  pub daily_request_delay_ms: u64,
  pub quizzes_per_level: usize,
  pub play_time_budget_secs: u32,
  pub http_timeout_secs: u64,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      cooldown_secs: 600,
      questions_per_quiz: 5,
      daily_quiz_count: 3,
      questions_per_daily_quiz: 10,
      daily_request_delay_ms: 500,
      quizzes_per_level: 3,
      play_time_budget_secs: 300,
      http_timeout_secs: 30,
    }
  }
}

impl Limits {
  pub fn cooldown(&self) -> Duration { Duration::from_secs(self.cooldown_secs) }
  pub fn daily_request_delay(&self) -> Duration { Duration::from_millis(self.daily_request_delay_ms) }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "quizly_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizly_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizly_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
