//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic and the student store; failures map through `ApiError`.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  response::IntoResponse,
  Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::domain::ScoreRecord;
use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

// -------- Students --------

#[instrument(level = "info", skip(state, body), fields(name_len = body.name.len()))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<impl IntoResponse, ApiError> {
  let profile = state
    .store
    .register(&body.name)
    .await
    .ok_or_else(|| ApiError::BadRequest("name required".into()))?;
  info!(target: "starpath_backend", id = %profile.id, "Student registered or logged in");
  Ok(Json(profile))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_student(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::load_profile(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_dashboard(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::student_dashboard(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, score = body.score, total = body.total))]
pub async fn http_post_progress(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ProgressIn>,
) -> Result<impl IntoResponse, ApiError> {
  let record = ScoreRecord {
    date: Utc::now(),
    mode: body.mode,
    subject: body.subject,
    score: body.score,
    total: body.total,
    details: body.details,
  };
  state
    .store
    .append_score(&id, record)
    .await
    .map_err(|_| ApiError::UnknownStudent(id.clone()))?;
  Ok(Json(logic::load_profile(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, title = %body.title))]
pub async fn http_post_achievement(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AchievementIn>,
) -> Result<impl IntoResponse, ApiError> {
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("achievement title required".into()));
  }
  state
    .store
    .append_achievement(&id, body.title.trim(), &body.description)
    .await
    .map_err(|_| ApiError::UnknownStudent(id.clone()))?;
  Ok(Json(logic::load_profile(&state, &id).await?))
}

// -------- Adaptive practice --------

#[instrument(level = "info", skip(state, body), fields(student = %body.student_id, topic = %body.topic))]
pub async fn http_start_practice(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartPracticeIn>,
) -> Result<impl IntoResponse, ApiError> {
  let round = logic::start_practice(
    &state,
    &body.student_id,
    &body.topic,
    body.subtopic,
    body.max_questions,
  )
  .await?;
  Ok(Json(round))
}

#[instrument(level = "info", skip(state, body), fields(%id, answer_len = body.answer.len()))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, ApiError> {
  let result = logic::submit_practice_answer(&state, &id, &body.answer).await?;
  info!(target: "practice", session = %id, correct = result.correct, "HTTP submit_answer evaluated");
  Ok(Json(result))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let text = logic::practice_hint(&state, &id).await?;
  info!(target: "practice", session = %id, "HTTP hint served");
  Ok(Json(HintOut { text }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_advance(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::advance_practice(&state, &id).await?))
}

// -------- Timed exams --------

#[instrument(level = "info", skip(state, body), fields(student = %body.student_id))]
pub async fn http_start_exam(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartExamIn>,
) -> Result<impl IntoResponse, ApiError> {
  let view = logic::start_exam(&state, &body.student_id, body.count, body.year_level).await?;
  Ok(Json(view))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_exam_view(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::exam_view(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, index = body.index))]
pub async fn http_exam_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ExamAnswerIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::record_exam_answer(&state, &id, body.index, body.answer).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_exam_navigate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ExamNavigateIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::navigate_exam(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_exam_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let result = logic::finalize_exam(&state, &id).await?;
  info!(target: "practice", session = %id, score = result.summary.score, "HTTP exam submitted");
  Ok(Json(result))
}
