//! WebSocket upgrade + play loop. Each connection owns at most one play session;
//! client messages are parsed as JSON and forwarded to core logic, and a
//! one-second interval drives the countdown while a session is running.

use std::sync::Arc;
use std::time::Duration;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::logic::{handle_play_message, tick_play};
use crate::play::PlaySession;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizly_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(conn = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quizly_backend", "WebSocket connected");
  let mut session: Option<PlaySession> = None;
  let mut ticker = tokio::time::interval(Duration::from_secs(1));
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    let running = session.as_ref().is_some_and(|s| !s.is_completed());
    let replies = tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "quizly_backend", "WS received: {:?}", &incoming);
              let opens = matches!(incoming, ClientWsMessage::OpenQuiz { .. });
              let replies = handle_play_message(&state, &mut session, incoming).await;
              if opens {
                // A fresh session gets a full second before its first tick.
                ticker.reset();
              }
              replies
            }
            Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
          },
          Message::Ping(payload) => {
            let _ = socket.send(Message::Pong(payload)).await;
            Vec::new()
          }
          Message::Close(_) => break,
          _ => Vec::new(),
        }
      }
      _ = ticker.tick(), if running => tick_play(&mut session).into_iter().collect(),
    };

    for reply in replies {
      if let Err(e) = send(&mut socket, &reply).await {
        error!(target: "quizly_backend", error = %e, "WS send error");
        info!(target: "quizly_backend", "WebSocket disconnected");
        return;
      }
    }
  }
  info!(target: "quizly_backend", "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}
