//! AI quiz generation: prompt building, JSON extraction, validation and mapping.
//!
//! Flow:
//! 1) Fill the configured template with category + question count.
//! 2) Send it through a [`TextGenerator`] (Gemini in production).
//! 3) Pull the first balanced `{...}` span out of the free-form reply.
//! 4) Deserialize, validate every question, then stamp ids, `createdAt` and a random difficulty.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::config::{Limits, Prompts};
use crate::domain::{Difficulty, Quiz, QuizQuestion, CATEGORY_POOL};
use crate::error::QuizError;
use crate::gemini::TextGenerator;
use crate::util::{extract_json_object, fill_template, random_id, trunc_for_log};

const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Deserialize)]
struct RawQuiz {
  #[serde(default)]
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
  question: String,
  options: Vec<String>,
  #[serde(rename = "correctAnswer", alias = "correct_answer")]
  correct_answer: String,
  #[serde(default)]
  explanation: Option<String>,
}

#[derive(Clone)]
pub struct QuizGenerator {
  llm: Arc<dyn TextGenerator>,
  clock: Arc<dyn Clock>,
  prompts: Prompts,
  questions_per_daily_quiz: usize,
  daily_request_delay: Duration,
}

impl QuizGenerator {
  pub fn new(llm: Arc<dyn TextGenerator>, clock: Arc<dyn Clock>, prompts: Prompts, limits: &Limits) -> Self {
    Self {
      llm,
      clock,
      prompts,
      questions_per_daily_quiz: limits.questions_per_daily_quiz.max(1),
      daily_request_delay: limits.daily_request_delay(),
    }
  }

  pub fn build_prompt(&self, category: &str, question_count: usize) -> String {
    let count = question_count.to_string();
    fill_template(&self.prompts.quiz_user_template, &[("category", category), ("count", &count)])
  }

  /// Generate one quiz on `category` with `question_count` questions.
  ///
  /// # Errors
  /// * [`QuizError::Validation`] for a blank category or a zero count.
  /// * [`QuizError::Network`] when the model endpoint fails.
  /// * [`QuizError::Parse`] when the reply holds no usable quiz JSON.
  #[instrument(level = "info", skip(self))]
  pub async fn generate_quiz(&self, category: &str, question_count: usize) -> Result<Quiz, QuizError> {
    let category = category.trim();
    if category.is_empty() {
      return Err(QuizError::Validation("category must not be empty".into()));
    }
    if question_count == 0 {
      return Err(QuizError::Validation("question count must be at least 1".into()));
    }

    let prompt = self.build_prompt(category, question_count);
    let start = std::time::Instant::now();
    let text = match self.llm.generate_text(&self.prompts.quiz_system, &prompt).await {
      Ok(t) => t,
      Err(e) => {
        error!(target: "quiz", elapsed = ?start.elapsed(), error = %e, "Model call failed during quiz generation");
        return Err(e);
      }
    };

    let created_at = self.clock.now().with_timezone(&Utc);
    let quiz = parse_quiz_text(&text, category, question_count, created_at, &mut rand::thread_rng())
      .inspect_err(|e| {
        warn!(target: "quiz", error = %e, reply = %trunc_for_log(&text, 300), "Rejected model reply");
      })?;

    info!(
      target: "quiz",
      quiz_id = %quiz.id,
      questions = quiz.questions.len(),
      difficulty = quiz.difficulty.as_str(),
      title = %quiz.title.chars().take(40).collect::<String>(),
      "Quiz successfully generated"
    );
    Ok(quiz)
  }

  /// Generate `count` quizzes on distinct categories from [`CATEGORY_POOL`], one at a time.
  ///
  /// The first failure aborts the batch and the quizzes produced so far in this
  /// call are dropped.
  #[instrument(level = "info", skip(self))]
  pub async fn generate_daily_quizzes(&self, count: usize) -> Result<Vec<Quiz>, QuizError> {
    let categories = pick_categories(count, &mut rand::thread_rng());
    if categories.len() < count {
      warn!(target: "quiz", requested = count, available = categories.len(), "Daily count clamped to category pool size");
    }

    let mut quizzes = Vec::with_capacity(categories.len());
    for (i, category) in categories.iter().enumerate() {
      if i > 0 {
        tokio::time::sleep(self.daily_request_delay).await;
      }
      match self.generate_quiz(category, self.questions_per_daily_quiz).await {
        Ok(q) => quizzes.push(q),
        Err(e) => {
          error!(target: "quiz", %category, done = quizzes.len(), error = %e, "Daily batch aborted");
          return Err(e);
        }
      }
    }

    info!(target: "quiz", count = quizzes.len(), "Daily quizzes generated");
    Ok(quizzes)
  }
}

/// Up to `count` distinct categories, shuffled. Clamped to the pool size.
pub fn pick_categories<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<&'static str> {
  let mut pool = CATEGORY_POOL.to_vec();
  pool.shuffle(rng);
  pool.truncate(count);
  pool
}

/// Turn free-form model output into a validated [`Quiz`].
///
/// Every question must carry exactly four distinct options and a
/// `correctAnswer` equal to one of them; one bad question rejects the quiz.
/// Extra questions beyond `requested` are dropped.
pub fn parse_quiz_text<R: Rng + ?Sized>(
  text: &str,
  category: &str,
  requested: usize,
  created_at: DateTime<Utc>,
  rng: &mut R,
) -> Result<Quiz, QuizError> {
  let span = extract_json_object(text)
    .ok_or_else(|| QuizError::Parse("could not extract JSON from the response".into()))?;
  let raw: RawQuiz = serde_json::from_str(span)
    .map_err(|e| QuizError::Parse(format!("malformed quiz JSON: {e}")))?;

  if raw.questions.is_empty() {
    return Err(QuizError::Parse("quiz has no questions".into()));
  }
  for (i, q) in raw.questions.iter().enumerate() {
    validate_question(q).map_err(|why| QuizError::Parse(format!("question {}: {why}", i + 1)))?;
  }
  if raw.questions.len() < requested {
    warn!(target: "quiz", requested, received = raw.questions.len(), "Model returned fewer questions than requested");
  }

  let questions = raw.questions.into_iter()
    .take(requested.max(1))
    .enumerate()
    .map(|(i, q)| QuizQuestion {
      id: format!("q-{}-{}", i, random_id(rng)),
      question: q.question.trim().to_string(),
      options: q.options,
      correct_answer: q.correct_answer,
      explanation: q.explanation.filter(|e| !e.trim().is_empty()),
    })
    .collect();

  let title = raw.title.trim();
  Ok(Quiz {
    id: random_id(rng),
    title: if title.is_empty() { format!("{category} Quiz") } else { title.to_string() },
    category: category.to_string(),
    description: raw.description.trim().to_string(),
    questions,
    created_at,
    difficulty: Difficulty::random(rng),
  })
}

fn validate_question(q: &RawQuestion) -> Result<(), String> {
  if q.question.trim().is_empty() {
    return Err("empty question text".into());
  }
  if q.options.len() != OPTIONS_PER_QUESTION {
    return Err(format!("expected {OPTIONS_PER_QUESTION} options, got {}", q.options.len()));
  }
  for (i, opt) in q.options.iter().enumerate() {
    if q.options[..i].contains(opt) {
      return Err(format!("duplicate option '{opt}'"));
    }
  }
  if !q.options.contains(&q.correct_answer) {
    return Err(format!("correct answer '{}' is not one of the options", q.correct_answer));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{quiz_json, ManualClock, ScriptedGenerator};
  use rand::SeedableRng;
  use std::collections::HashSet;

  fn generator(script: Arc<ScriptedGenerator>) -> QuizGenerator {
    QuizGenerator::new(script, Arc::new(ManualClock::at_noon()), Prompts::default(), &Limits::default())
  }

  fn rng() -> rand::rngs::StdRng { rand::rngs::StdRng::seed_from_u64(9) }

  #[test]
  fn prompt_names_category_and_count() {
    let gen = generator(Arc::new(ScriptedGenerator::default()));
    let prompt = gen.build_prompt("Volcanoes", 7);
    assert!(prompt.contains("Create a quiz about Volcanoes with exactly 7 multiple choice questions"));
    assert!(prompt.contains("\"correctAnswer\""));
    assert!(!prompt.contains("{category}"));
  }

  #[test]
  fn parses_reply_wrapped_in_commentary() {
    let text = format!("Here is your quiz!\n```json\n{}\n```\nHave fun.", quiz_json("Rivers", 3));
    let quiz = parse_quiz_text(&text, "Geography", 3, Utc::now(), &mut rng()).unwrap();
    assert_eq!(quiz.title, "Rivers");
    assert_eq!(quiz.category, "Geography");
    assert_eq!(quiz.questions.len(), 3);
    assert_eq!(quiz.questions[1].correct_answer, "A1");
    assert!(quiz.questions[0].id.starts_with("q-0-"));
    assert!(quiz.questions[2].id.starts_with("q-2-"));

    let ids: HashSet<_> = quiz.questions.iter().map(|q| q.id.clone()).collect();
    assert_eq!(ids.len(), 3);
  }

  #[test]
  fn reply_without_json_is_a_parse_error() {
    let err = parse_quiz_text("Sorry, I can't do that.", "History", 5, Utc::now(), &mut rng()).unwrap_err();
    assert!(matches!(err, QuizError::Parse(_)));
  }

  #[test]
  fn malformed_json_is_a_parse_error() {
    let err = parse_quiz_text("{\"title\": \"x\", \"questions\": [{\"question\": 1}]}", "History", 5, Utc::now(), &mut rng()).unwrap_err();
    assert!(matches!(err, QuizError::Parse(_)));
  }

  #[test]
  fn zero_questions_never_becomes_a_quiz() {
    let err = parse_quiz_text("{\"title\": \"Empty\", \"questions\": []}", "History", 5, Utc::now(), &mut rng()).unwrap_err();
    assert_eq!(err, QuizError::Parse("quiz has no questions".into()));
  }

  #[test]
  fn correct_answer_must_be_an_option() {
    let text = r#"{"title":"T","description":"D","questions":[
      {"question":"Q?","options":["a","b","c","d"],"correctAnswer":"e"}]}"#;
    let err = parse_quiz_text(text, "Music", 1, Utc::now(), &mut rng()).unwrap_err();
    assert!(matches!(err, QuizError::Parse(ref m) if m.contains("not one of the options")));
  }

  #[test]
  fn exactly_four_distinct_options_required() {
    let three = r#"{"title":"T","questions":[{"question":"Q?","options":["a","b","c"],"correctAnswer":"a"}]}"#;
    assert!(matches!(parse_quiz_text(three, "Music", 1, Utc::now(), &mut rng()), Err(QuizError::Parse(_))));

    let dup = r#"{"title":"T","questions":[{"question":"Q?","options":["a","b","a","d"],"correctAnswer":"a"}]}"#;
    let err = parse_quiz_text(dup, "Music", 1, Utc::now(), &mut rng()).unwrap_err();
    assert!(matches!(err, QuizError::Parse(ref m) if m.contains("duplicate option")));
  }

  #[test]
  fn extra_questions_are_truncated_and_blank_title_filled() {
    let mut value: serde_json::Value = serde_json::from_str(&quiz_json("", 6)).unwrap();
    value["questions"][0]["explanation"] = serde_json::json!("  ");
    let quiz = parse_quiz_text(&value.to_string(), "Sports", 4, Utc::now(), &mut rng()).unwrap();
    assert_eq!(quiz.questions.len(), 4);
    assert_eq!(quiz.title, "Sports Quiz");
    assert_eq!(quiz.questions[0].explanation, None);
    assert_eq!(quiz.questions[1].explanation.as_deref(), Some("A1 is right"));
  }

  #[test]
  fn fewer_questions_than_requested_are_accepted() {
    let quiz = parse_quiz_text(&quiz_json("Short", 2), "Music", 5, Utc::now(), &mut rng()).unwrap();
    assert_eq!(quiz.questions.len(), 2);
  }

  #[test]
  fn category_picks_are_distinct_and_clamped() {
    let mut r = rng();
    let picked = pick_categories(4, &mut r);
    assert_eq!(picked.len(), 4);
    assert_eq!(picked.iter().collect::<HashSet<_>>().len(), 4);
    assert_eq!(pick_categories(50, &mut r).len(), CATEGORY_POOL.len());
    assert!(pick_categories(0, &mut r).is_empty());
  }

  #[tokio::test]
  async fn generate_quiz_returns_requested_count() {
    let script = Arc::new(ScriptedGenerator::new([Ok(quiz_json("Stars", 5))]));
    let quiz = generator(script.clone()).generate_quiz("  Astronomy ", 5).await.unwrap();
    assert_eq!(quiz.questions.len(), 5);
    assert_eq!(quiz.category, "Astronomy");
    assert_eq!(quiz.created_at, ManualClock::at_noon().now().with_timezone(&Utc));
    assert_eq!(script.calls(), 1);
    assert!(script.prompts()[0].contains("exactly 5 multiple choice"));
  }

  #[tokio::test]
  async fn generate_quiz_rejects_blank_category_without_calling_model() {
    let script = Arc::new(ScriptedGenerator::default());
    let err = generator(script.clone()).generate_quiz("   ", 5).await.unwrap_err();
    assert!(matches!(err, QuizError::Validation(_)));
    assert_eq!(script.calls(), 0);
  }

  #[tokio::test]
  async fn network_errors_pass_through() {
    let script = Arc::new(ScriptedGenerator::new([Err(QuizError::Network { status: Some(429), message: "quota".into() })]));
    let err = generator(script).generate_quiz("Music", 5).await.unwrap_err();
    assert_eq!(err, QuizError::Network { status: Some(429), message: "quota".into() });
  }

  #[tokio::test(start_paused = true)]
  async fn daily_batch_runs_sequentially_with_delay() {
    let script = Arc::new(ScriptedGenerator::new((0..3).map(|i| Ok(quiz_json(&format!("Daily {i}"), 10)))));
    let gen = generator(script.clone());

    let started = tokio::time::Instant::now();
    let quizzes = gen.generate_daily_quizzes(3).await.unwrap();
    assert_eq!(quizzes.len(), 3);
    assert!(quizzes.iter().all(|q| q.questions.len() == 10));
    assert_eq!(quizzes.iter().map(|q| q.category.clone()).collect::<HashSet<_>>().len(), 3);
    // Two gaps between three calls.
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert!(script.prompts().iter().all(|p| p.contains("exactly 10 multiple choice")));
  }

  #[tokio::test(start_paused = true)]
  async fn daily_batch_fails_fast_and_drops_partial_results() {
    let script = Arc::new(ScriptedGenerator::new([
      Ok(quiz_json("First", 10)),
      Ok("no json here".to_string()),
      Ok(quiz_json("Third", 10)),
    ]));
    let err = generator(script.clone()).generate_daily_quizzes(3).await.unwrap_err();
    assert!(matches!(err, QuizError::Parse(_)));
    assert_eq!(script.calls(), 2);
  }

  #[tokio::test]
  async fn daily_batch_of_zero_makes_no_calls() {
    let script = Arc::new(ScriptedGenerator::default());
    assert!(generator(script.clone()).generate_daily_quizzes(0).await.unwrap().is_empty());
    assert_eq!(script.calls(), 0);
  }
}
