//! Test doubles shared by module tests: scripted model output, manual clock, sample quizzes.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::clock::Clock;
use crate::domain::{Difficulty, Quiz, QuizQuestion};
use crate::error::QuizError;
use crate::gemini::TextGenerator;

/// Replays queued responses in order; records every prompt it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
  responses: Mutex<VecDeque<Result<String, QuizError>>>,
  prompts: Mutex<Vec<String>>,
  latency: Option<std::time::Duration>,
}

impl ScriptedGenerator {
  pub fn new(responses: impl IntoIterator<Item = Result<String, QuizError>>) -> Self {
    Self { responses: Mutex::new(responses.into_iter().collect()), ..Self::default() }
  }

  /// Each call sleeps on tokio time first, so other tasks can observe the in-flight state.
  pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  pub fn push(&self, response: Result<String, QuizError>) {
    self.responses.lock().unwrap().push_back(response);
  }

  pub fn prompts(&self) -> Vec<String> {
    self.prompts.lock().unwrap().clone()
  }

  pub fn calls(&self) -> usize {
    self.prompts.lock().unwrap().len()
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn generate_text(&self, _system: &str, prompt: &str) -> Result<String, QuizError> {
    self.prompts.lock().unwrap().push(prompt.to_string());
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
    self.responses.lock().unwrap().pop_front()
      .unwrap_or_else(|| Err(QuizError::Network { status: Some(500), message: "script exhausted".into() }))
  }
}

/// Clock that only moves when told to.
pub struct ManualClock {
  now: Mutex<DateTime<Local>>,
}

impl ManualClock {
  pub fn at_noon() -> Self {
    let noon = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().unwrap();
    Self { now: Mutex::new(noon) }
  }

  pub fn advance(&self, by: Duration) {
    *self.now.lock().unwrap() += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Local> { *self.now.lock().unwrap() }
}

/// Model-style JSON for `count` questions whose correct answer is always the first option.
pub fn quiz_json(title: &str, count: usize) -> String {
  let questions: Vec<serde_json::Value> = (0..count)
    .map(|i| serde_json::json!({
      "question": format!("Question {i}?"),
      "options": [format!("A{i}"), format!("B{i}"), format!("C{i}"), format!("D{i}")],
      "correctAnswer": format!("A{i}"),
      "explanation": format!("A{i} is right"),
    }))
    .collect();
  serde_json::json!({
    "title": title,
    "description": format!("About {title}"),
    "questions": questions,
  })
  .to_string()
}

pub fn sample_quiz(category: &str, count: usize) -> Quiz {
  Quiz {
    id: format!("quiz-{}", category.to_lowercase().replace(' ', "-")),
    title: format!("{category} Quiz"),
    category: category.to_string(),
    description: format!("All about {category}"),
    questions: (0..count)
      .map(|i| QuizQuestion {
        id: format!("q-{i}"),
        question: format!("Question {i}?"),
        options: vec![format!("A{i}"), format!("B{i}"), format!("C{i}"), format!("D{i}")],
        correct_answer: format!("A{i}"),
        explanation: if i % 2 == 0 { Some(format!("A{i} is right")) } else { None },
      })
      .collect(),
    created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).single().unwrap(),
    difficulty: Difficulty::Medium,
  }
}
