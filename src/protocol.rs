//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{DailyQuizLevel, Difficulty, Quiz};
use crate::error::QuizError;
use crate::orchestrator::GenerationState;
use crate::play::{format_clock, Feedback, PlaySession, Summary};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Start a play session. Without an id, the stored `currentQuiz` is used.
    OpenQuiz {
        #[serde(rename = "quizId", default)]
        quiz_id: Option<String>,
    },
    SelectAnswer {
        option: String,
    },
    NextQuestion,
    /// Back to the quiz list; drops the session.
    Leave,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Question {
        question: QuestionOut,
    },
    Feedback {
        feedback: Feedback,
    },
    Tick {
        remaining: u32,
        clock: String,
    },
    Completed {
        summary: Summary,
    },
    Left,
    Error {
        message: String,
    },
}

/// The question on screen. Deliberately omits the correct answer.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub quiz_id: String,
    pub quiz_title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub index: usize,
    pub total: usize,
    pub question_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub score: u32,
    pub remaining: u32,
    pub clock: String,
}

/// Build the on-screen question for a session; `None` once it is completed.
pub fn question_out(session: &PlaySession) -> Option<QuestionOut> {
    let index = session.current_index()?;
    let q = session.current_question()?;
    let quiz = session.quiz();
    Some(QuestionOut {
        quiz_id: quiz.id.clone(),
        quiz_title: quiz.title.clone(),
        category: quiz.category.clone(),
        difficulty: quiz.difficulty,
        index,
        total: session.total(),
        question_id: q.id.clone(),
        question: q.question.clone(),
        options: q.options.clone(),
        score: session.score(),
        remaining: session.remaining_secs(),
        clock: format_clock(session.remaining_secs()),
    })
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct CreateQuizIn {
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentQuizIn {
    pub quiz: Quiz,
}

#[derive(Serialize)]
pub struct LevelsOut {
    pub levels: Vec<DailyQuizLevel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOut {
    #[serde(flatten)]
    pub state: GenerationState,
    /// Minutes until another user generation is allowed; absent when allowed now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_minutes: Option<u64>,
}

#[derive(Serialize)]
pub struct CategoriesOut {
    pub categories: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOut {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_remaining: Option<u64>,
}

impl From<&QuizError> for ErrorOut {
    fn from(e: &QuizError) -> Self {
        ErrorOut {
            kind: e.kind().to_string(),
            message: e.user_message(),
            minutes_remaining: match e {
                QuizError::RateLimited { minutes_remaining } => Some(*minutes_remaining),
                _ => None,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub generation_enabled: bool,
}
