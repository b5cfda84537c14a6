//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Creating a user quiz and loading today's levels
//!   - The currentQuiz hand-off between the listing and play views
//!   - Driving a play session from client messages

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::domain::{DailyQuizLevel, Quiz};
use crate::error::QuizError;
use crate::play::{format_clock, Advance, PlaySession};
use crate::protocol::{question_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn create_user_quiz(state: &AppState, category: &str) -> Result<Quiz, QuizError> {
  let quiz = state.orchestrator.request_user_quiz(category).await?;
  // The freshly made quiz is what the play view opens next.
  state.cache().save_current_quiz(&quiz);
  Ok(quiz)
}

#[instrument(level = "info", skip(state))]
pub async fn load_daily_levels(state: &AppState) -> Result<Vec<DailyQuizLevel>, QuizError> {
  state.orchestrator.daily_levels().await
}

pub fn set_current_quiz(state: &AppState, quiz: &Quiz) {
  state.cache().save_current_quiz(quiz);
}

pub fn current_quiz(state: &AppState) -> Option<Quiz> {
  state.cache().load_current_quiz()
}

/// Apply one client message to the connection's play session.
/// Returns the replies to send, in order.
#[instrument(level = "debug", skip(state, session))]
pub async fn handle_play_message(
  state: &AppState,
  session: &mut Option<PlaySession>,
  msg: ClientWsMessage,
) -> Vec<ServerWsMessage> {
  match msg {
    ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

    ClientWsMessage::OpenQuiz { quiz_id } => {
      let Some(quiz) = state.find_quiz(quiz_id.as_deref()).await else {
        return vec![ServerWsMessage::Error { message: "No quiz found".into() }];
      };
      let s = PlaySession::new(Arc::new(quiz), state.config.limits.play_time_budget_secs);
      info!(target: "quiz", quiz_id = %s.quiz().id, questions = s.total(), "Play session opened");
      // An empty quiz or a zero budget opens straight into the summary.
      let reply = match (question_out(&s), s.summary()) {
        (Some(question), _) => ServerWsMessage::Question { question },
        (None, Some(summary)) => ServerWsMessage::Completed { summary },
        (None, None) => ServerWsMessage::Error { message: "Quiz has no questions".into() },
      };
      *session = Some(s);
      vec![reply]
    }

    ClientWsMessage::SelectAnswer { option } => {
      let Some(s) = session.as_mut() else { return no_session() };
      match s.select(&option) {
        Ok(feedback) => {
          debug!(target: "quiz", correct = feedback.correct, score = s.score(), "Answer recorded");
          vec![ServerWsMessage::Feedback { feedback }]
        }
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      }
    }

    ClientWsMessage::NextQuestion => {
      let Some(s) = session.as_mut() else { return no_session() };
      match s.next() {
        Ok(Advance::Question { .. }) => match question_out(s) {
          Some(question) => vec![ServerWsMessage::Question { question }],
          None => no_session(),
        },
        Ok(Advance::Completed(summary)) => {
          info!(target: "quiz", quiz_id = %s.quiz().id, score = summary.score, total = summary.total, "Quiz completed");
          vec![ServerWsMessage::Completed { summary }]
        }
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      }
    }

    ClientWsMessage::Leave => {
      if let Some(s) = session.take() {
        debug!(target: "quiz", quiz_id = %s.quiz().id, "Play session discarded");
      }
      vec![ServerWsMessage::Left]
    }
  }
}

/// One second of countdown for the connection's session, if one is running.
pub fn tick_play(session: &mut Option<PlaySession>) -> Option<ServerWsMessage> {
  let s = session.as_mut().filter(|s| !s.is_completed())?;
  Some(match s.tick() {
    Some(summary) => {
      info!(target: "quiz", quiz_id = %s.quiz().id, score = summary.score, "Time's up");
      ServerWsMessage::Completed { summary }
    }
    None => ServerWsMessage::Tick { remaining: s.remaining_secs(), clock: format_clock(s.remaining_secs()) },
  })
}

fn no_session() -> Vec<ServerWsMessage> {
  vec![ServerWsMessage::Error { message: "No quiz is open. Send open_quiz first.".into() }]
}
