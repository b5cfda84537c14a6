//! Grouping a flat quiz list into numbered daily levels.

use chrono::{DateTime, Utc};

use crate::domain::{DailyQuizLevel, Quiz};

pub const LEVEL_DESCRIPTIONS: [&str; 10] = [
  "Start your journey with these beginner-friendly quizzes",
  "Step up your knowledge with slightly more challenging questions",
  "Test your expanding expertise with these intermediate quizzes",
  "Challenge yourself with these advanced knowledge tests",
  "Only the most knowledgeable can conquer these expert quizzes",
  "Master-level questions for the truly dedicated",
  "Elite knowledge challenges for quiz enthusiasts",
  "Legendary difficulty for the quiz champions",
  "Supreme challenge for knowledge seekers",
  "Ultimate quizzes for the most dedicated minds",
];

/// Description for a 1-based level; everything past the last entry reuses it.
pub fn level_description(level: u32) -> &'static str {
  let idx = (level.saturating_sub(1) as usize).min(LEVEL_DESCRIPTIONS.len() - 1);
  LEVEL_DESCRIPTIONS[idx]
}

/// Split `quizzes` into consecutive levels of `batch_size` (the last may be shorter).
///
/// Pure: the same input always yields the same levels, ids included.
/// A `batch_size` of zero is treated as one.
pub fn build_levels(quizzes: &[Quiz], batch_size: usize, created_at: DateTime<Utc>) -> Vec<DailyQuizLevel> {
  quizzes
    .chunks(batch_size.max(1))
    .enumerate()
    .map(|(i, chunk)| {
      let level = i as u32 + 1;
      DailyQuizLevel {
        id: format!("level-{level}"),
        level,
        title: format!("Level {level}"),
        description: level_description(level).to_string(),
        quizzes: chunk.to_vec(),
        created_at,
      }
    })
    .collect()
}
