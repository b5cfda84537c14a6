//! Domain models shared by every layer: quizzes, questions, difficulty and daily levels.
//!
//! Field names serialize in camelCase so the browser UI and the local cache
//! read the same shape.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Categories used for the daily batch. User quizzes may use any free text.
pub const CATEGORY_POOL: [&str; 10] = [
  "Science & Technology",
  "History",
  "Geography",
  "Arts & Literature",
  "Sports",
  "Music",
  "Movies & TV Shows",
  "Food & Cooking",
  "General Knowledge",
  "Pop Culture",
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  /// Uniform pick. Not derived from the quiz content.
  pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
    Self::ALL[rng.gen_range(0..Self::ALL.len())]
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub id: String,
  pub question: String,
  pub options: Vec<String>,
  /// Always one of `options` for quizzes produced by the generator.
  pub correct_answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

impl QuizQuestion {
  pub fn is_correct(&self, option: &str) -> bool {
    self.correct_answer == option
  }
}

/// A generated quiz. Never mutated after the generator hands it out.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: String,
  pub title: String,
  pub category: String,
  pub description: String,
  pub questions: Vec<QuizQuestion>,
  pub created_at: DateTime<Utc>,
  pub difficulty: Difficulty,
}

impl Quiz {
  pub fn question_count(&self) -> usize {
    self.questions.len()
  }
}

/// A fixed-size group of quizzes shown together as one daily unit.
/// Derived from the flat quiz list; never persisted on its own.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuizLevel {
  pub id: String,
  pub level: u32,
  pub title: String,
  pub description: String,
  pub quizzes: Vec<Quiz>,
  pub created_at: DateTime<Utc>,
}
