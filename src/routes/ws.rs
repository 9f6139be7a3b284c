//! WebSocket upgrade + message loop. Each client message is parsed as JSON
//! and forwarded to core logic. We reply with a single JSON message per
//! request; `ApiError`s become `Error` messages instead of closing the
//! socket.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "starpath_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "starpath_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "starpath_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "starpath_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "starpath_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, msg))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Register { name } => match state.store.register(&name).await {
      Some(profile) => ServerWsMessage::Student { profile },
      None => ServerWsMessage::Error { message: "Name required".into() },
    },

    ClientWsMessage::Profile { student_id } => {
      match logic::load_profile(state, &student_id).await {
        Ok(profile) => ServerWsMessage::Student { profile },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::StartPractice { student_id, topic, subtopic, max_questions } => {
      match logic::start_practice(state, &student_id, &topic, subtopic, max_questions).await {
        Ok(round) => {
          tracing::info!(target: "practice", session = %round.session_id, %topic, "WS practice started");
          ServerWsMessage::PracticeRound { round }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitAnswer { session_id, answer } => {
      match logic::submit_practice_answer(state, &session_id, &answer).await {
        Ok(result) => {
          tracing::info!(target: "practice", session = %session_id, correct = result.correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult { result }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Hint { session_id } => {
      match logic::practice_hint(state, &session_id).await {
        Ok(text) => {
          tracing::info!(target: "practice", session = %session_id, "WS hint served");
          ServerWsMessage::Hint { text }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Advance { session_id } => {
      match logic::advance_practice(state, &session_id).await {
        Ok(crate::protocol::AdvanceOut::Round(round)) => ServerWsMessage::PracticeRound { round },
        Ok(crate::protocol::AdvanceOut::Summary(summary)) => {
          ServerWsMessage::PracticeComplete { summary }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::StartExam { student_id, count, year_level } => {
      match logic::start_exam(state, &student_id, count, year_level).await {
        Ok(exam) => ServerWsMessage::ExamState { exam },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ExamAnswer { session_id, index, answer } => {
      match logic::record_exam_answer(state, &session_id, index, answer).await {
        Ok(exam) => ServerWsMessage::ExamState { exam },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ExamNavigate { session_id, op } => {
      match logic::navigate_exam(state, &session_id, op).await {
        Ok(exam) => ServerWsMessage::ExamState { exam },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ExamView { session_id } => {
      match logic::exam_view(state, &session_id).await {
        Ok(exam) => ServerWsMessage::ExamState { exam },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ExamSubmit { session_id } => {
      match logic::finalize_exam(state, &session_id).await {
        Ok(result) => {
          tracing::info!(target: "practice", session = %session_id, score = result.summary.score, "WS exam submitted");
          ServerWsMessage::ExamFinished { result }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}
