//! Error taxonomy for generation, storage and play.
//!
//! Generator and orchestrator failures surface as [`QuizError`]; the UI only ever
//! sees [`QuizError::user_message`]. Storage failures never leave the cache layer.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("rate limited: {minutes_remaining} minute(s) remaining")]
  RateLimited { minutes_remaining: u64 },

  #[error("a generation is already in progress")]
  Busy,

  #[error("generation request failed (status {status:?}): {message}")]
  Network { status: Option<u16>, message: String },

  #[error("could not parse model response: {0}")]
  Parse(String),

  #[error("quiz generation is not configured")]
  Unavailable,
}

impl QuizError {
  pub fn kind(&self) -> &'static str {
    match self {
      QuizError::Validation(_) => "validation",
      QuizError::RateLimited { .. } => "rate_limited",
      QuizError::Busy => "busy",
      QuizError::Network { .. } => "network",
      QuizError::Parse(_) => "parse",
      QuizError::Unavailable => "unavailable",
    }
  }

  /// Text shown to the user. Network, parse and configuration details stay in the logs.
  pub fn user_message(&self) -> String {
    match self {
      QuizError::Validation(_) => "Please select a category".into(),
      QuizError::RateLimited { minutes_remaining } => {
        format!("Please wait {minutes_remaining} minutes before generating another quiz")
      }
      QuizError::Busy => "A quiz is already being generated. Please wait.".into(),
      QuizError::Network { .. } | QuizError::Parse(_) | QuizError::Unavailable => {
        "Failed to generate quiz. Please try again later.".into()
      }
    }
  }
}

#[derive(Error, Debug)]
pub enum StorageError {
  #[error("storage I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("stored data is not valid JSON: {0}")]
  Serde(#[from] serde_json::Error),

  #[error("storage quota exceeded ({needed} bytes needed, {limit} allowed)")]
  QuotaExceeded { needed: usize, limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
  #[error("this question has already been answered")]
  AlreadyAnswered,

  #[error("answer the current question first")]
  NotAnswered,

  #[error("the quiz is already completed")]
  Completed,

  #[error("'{0}' is not one of the options")]
  UnknownOption(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_messages_hide_transport_details() {
    let err = QuizError::Network { status: Some(503), message: "upstream down".into() };
    assert_eq!(err.user_message(), "Failed to generate quiz. Please try again later.");
    assert_eq!(err.kind(), "network");
    assert!(!err.user_message().contains("503"));
  }

  #[test]
  fn rate_limit_message_carries_minutes() {
    let err = QuizError::RateLimited { minutes_remaining: 7 };
    assert_eq!(err.user_message(), "Please wait 7 minutes before generating another quiz");
  }
}
