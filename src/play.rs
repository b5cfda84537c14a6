//! Question-by-question play state machine with a countdown.
//!
//! States: `Answering(i)` -> select -> `Answered(i, chosen)` -> next -> `Answering(i+1)`
//! or `Completed`. The countdown reaching zero forces `Completed` from any state;
//! `Completed` is terminal. The session reads its quiz through an `Arc` and never
//! mutates it.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;

use crate::domain::{Quiz, QuizQuestion};
use crate::error::PlayError;

/// Score percentage at or above which the summary congratulates the player.
pub const PASS_PERCENTAGE: u32 = 70;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
  Finished,
  TimeUp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayState {
  Answering { index: usize },
  Answered { index: usize, chosen: String },
  Completed { score: u32, reason: CompletionReason },
}

/// Emitted on every answer selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub question_id: String,
  pub correct: bool,
  pub correct_answer: String,
  pub title: String,
  pub message: String,
}

/// Emitted once, when the session completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub score: u32,
  pub total: usize,
  pub percentage: u32,
  pub passed: bool,
  pub reason: CompletionReason,
  pub title: String,
  pub message: String,
}

/// Result of `next()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
  Question { index: usize },
  Completed(Summary),
}

pub struct PlaySession {
  quiz: Arc<Quiz>,
  state: PlayState,
  answers: HashMap<String, String>,
  score: u32,
  remaining_secs: u32,
}

impl PlaySession {
  pub fn new(quiz: Arc<Quiz>, time_budget_secs: u32) -> Self {
    let state = if quiz.questions.is_empty() || time_budget_secs == 0 {
      PlayState::Completed { score: 0, reason: if quiz.questions.is_empty() { CompletionReason::Finished } else { CompletionReason::TimeUp } }
    } else {
      PlayState::Answering { index: 0 }
    };
    Self { quiz, state, answers: HashMap::new(), score: 0, remaining_secs: time_budget_secs }
  }

  pub fn quiz(&self) -> &Quiz { &self.quiz }
  pub fn state(&self) -> &PlayState { &self.state }
  pub fn score(&self) -> u32 { self.score }
  pub fn remaining_secs(&self) -> u32 { self.remaining_secs }
  pub fn total(&self) -> usize { self.quiz.questions.len() }

  pub fn is_completed(&self) -> bool {
    matches!(self.state, PlayState::Completed { .. })
  }

  /// Index of the question on screen; `None` once completed.
  pub fn current_index(&self) -> Option<usize> {
    match self.state {
      PlayState::Answering { index } | PlayState::Answered { index, .. } => Some(index),
      PlayState::Completed { .. } => None,
    }
  }

  pub fn current_question(&self) -> Option<&QuizQuestion> {
    self.current_index().and_then(|i| self.quiz.questions.get(i))
  }

  pub fn answer_for(&self, question_id: &str) -> Option<&str> {
    self.answers.get(question_id).map(String::as_str)
  }

  /// Lock in `option` for the current question.
  pub fn select(&mut self, option: &str) -> Result<Feedback, PlayError> {
    let index = match &self.state {
      PlayState::Answering { index } => *index,
      PlayState::Answered { .. } => return Err(PlayError::AlreadyAnswered),
      PlayState::Completed { .. } => return Err(PlayError::Completed),
    };
    let question = &self.quiz.questions[index];
    if !question.options.iter().any(|o| o == option) {
      return Err(PlayError::UnknownOption(option.to_string()));
    }

    let correct = question.is_correct(option);
    if correct {
      self.score += 1;
    }
    let (title, message) = if correct {
      ("Correct!", question.explanation.clone().unwrap_or_else(|| "Great job!".into()))
    } else {
      (
        "Incorrect",
        question.explanation.clone()
          .unwrap_or_else(|| format!("The correct answer was: {}", question.correct_answer)),
      )
    };
    let feedback = Feedback {
      question_id: question.id.clone(),
      correct,
      correct_answer: question.correct_answer.clone(),
      title: title.into(),
      message,
    };

    self.answers.insert(question.id.clone(), option.to_string());
    self.state = PlayState::Answered { index, chosen: option.to_string() };
    Ok(feedback)
  }

  /// Move past an answered question, completing after the last one.
  pub fn next(&mut self) -> Result<Advance, PlayError> {
    let index = match &self.state {
      PlayState::Answered { index, .. } => *index,
      PlayState::Answering { .. } => return Err(PlayError::NotAnswered),
      PlayState::Completed { .. } => return Err(PlayError::Completed),
    };
    if index + 1 < self.quiz.questions.len() {
      self.state = PlayState::Answering { index: index + 1 };
      Ok(Advance::Question { index: index + 1 })
    } else {
      Ok(Advance::Completed(self.complete(CompletionReason::Finished)))
    }
  }

  /// One second of countdown. Returns the summary when this tick ran the clock out.
  pub fn tick(&mut self) -> Option<Summary> {
    if self.is_completed() {
      return None;
    }
    self.remaining_secs = self.remaining_secs.saturating_sub(1);
    if self.remaining_secs == 0 {
      return Some(self.complete(CompletionReason::TimeUp));
    }
    None
  }

  /// Drop the countdown to zero immediately.
  pub fn expire(&mut self) -> Option<Summary> {
    if self.is_completed() {
      return None;
    }
    self.remaining_secs = 0;
    Some(self.complete(CompletionReason::TimeUp))
  }

  pub fn summary(&self) -> Option<Summary> {
    match self.state {
      PlayState::Completed { score, reason } => Some(summarize(score, self.total(), reason)),
      _ => None,
    }
  }

  fn complete(&mut self, reason: CompletionReason) -> Summary {
    self.state = PlayState::Completed { score: self.score, reason };
    summarize(self.score, self.total(), reason)
  }
}

fn summarize(score: u32, total: usize, reason: CompletionReason) -> Summary {
  let percentage = if total == 0 { 0 } else { (f64::from(score) * 100.0 / total as f64).round() as u32 };
  let passed = percentage >= PASS_PERCENTAGE;
  let title = match reason {
    CompletionReason::Finished => "Quiz Completed!",
    CompletionReason::TimeUp => "Time's up!",
  };
  let message = if passed {
    "Great job! You have a good understanding of this topic."
  } else {
    "Keep practicing to improve your knowledge on this topic."
  };
  Summary {
    score,
    total,
    percentage,
    passed,
    reason,
    title: title.into(),
    message: message.into(),
  }
}

/// `m:ss` countdown label.
pub fn format_clock(secs: u32) -> String {
  format!("{}:{:02}", secs / 60, secs % 60)
}
