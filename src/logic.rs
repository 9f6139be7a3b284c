//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting/driving adaptive drill sessions (fetch, submit, hint,
//!     advance) against the session state machines
//!   - Starting/driving timed exams, including the countdown task and the
//!     single finalize path
//!   - The post-completion task list (persistence, achievement grant):
//!     each task independently fallible, logged on failure, never blocking
//!   - Profile/dashboard assembly

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::adaptive::{AdaptiveSession, AdvanceOutcome, SessionCtx, SubmitOutcome};
use crate::domain::{DifficultyLevel, PracticeMode, Question, ScoreRecord, SessionSummary, StudentProfile};
use crate::error::ApiError;
use crate::exam::ExamSession;
use crate::progress::{exam_achievement, ProgressAggregator};
use crate::protocol::{
  to_out, AdvanceOut, AnswerResultOut, DashboardOut, ExamNavigateIn, ExamResultOut,
  ExamReviewItem, ExamViewOut, PracticeRoundOut,
};
use crate::seeds::placeholder_question;
use crate::state::AppState;

const FEEDBACK_CORRECT_NO_HINT: &str = "✅ Correct! Amazing - you solved it without a hint! 🌟";
const FEEDBACK_CORRECT: &str = "✅ Correct! Great job.";
const FEEDBACK_WRONG: &str = "❌ Not quite right. Review the hint and try to understand the solution.";

// -------- Adaptive practice --------

#[instrument(level = "info", skip(state), fields(%student_id, %topic))]
pub async fn start_practice(
  state: &AppState,
  student_id: &str,
  topic: &str,
  subtopic: Option<String>,
  max_questions: Option<u32>,
) -> Result<PracticeRoundOut, ApiError> {
  let topic = topic.trim();
  if topic.is_empty() {
    return Err(ApiError::BadRequest("topic required".into()));
  }
  if !state.store.exists(student_id).await {
    return Err(ApiError::UnknownStudent(student_id.to_string()));
  }

  let ctx = SessionCtx {
    student_id: student_id.to_string(),
    topic: topic.to_lowercase(),
    subtopic: subtopic.unwrap_or_default(),
  };
  let max = max_questions.unwrap_or(state.session_cfg.max_questions);
  let mut session = AdaptiveSession::new(Uuid::new_v4().to_string(), ctx, max);

  let question = next_question(state, &session).await;
  session
    .install_question(question)
    .map_err(ApiError::InvalidAction)?;

  let round = round_out(&session);
  info!(target: "practice", session = %session.id, topic = %session.ctx.topic, "Adaptive session started");
  state.practice.write().await.insert(session.id.clone(), session);
  Ok(round)
}

/// Submit an answer for judging. Empty input is rejected up front; the
/// busy flag keeps a single judge call outstanding. A late verdict is
/// simply applied as the current state.
#[instrument(level = "info", skip(state, answer), fields(%session_id, answer_len = answer.len()))]
pub async fn submit_practice_answer(
  state: &AppState,
  session_id: &str,
  answer: &str,
) -> Result<AnswerResultOut, ApiError> {
  let answer = answer.trim();
  if answer.is_empty() {
    return Err(ApiError::BadRequest("empty answers are not submittable".into()));
  }

  // Phase 1: claim the submission slot and capture the question.
  let question = {
    let mut practice = state.practice.write().await;
    let session = practice
      .get_mut(session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
    session.begin_submit(answer).map_err(ApiError::InvalidAction)?
  };

  // Phase 2: judge without holding the registry lock.
  let correct = state.judge_answer(&question.text, answer, &question.answer).await;

  // Phase 3: apply the verdict.
  let (outcome, hint_used, reveal, summary) = {
    let mut practice = state.practice.write().await;
    let session = practice
      .get_mut(session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
    let outcome = session
      .apply_verdict(answer, correct)
      .map_err(ApiError::InvalidAction)?;
    let hint_used = session.attempts.last().map(|a| a.hint_used).unwrap_or(false);
    let reveal = session.revealed().map(|(a, h)| (a.to_string(), h.to_string()));
    let summary = session.summary().cloned();
    (outcome, hint_used, reveal, summary)
  };
  info!(target: "practice", %session_id, %correct, ?outcome, "Answer evaluated");

  match outcome {
    SubmitOutcome::CorrectNext => {
      let next = fetch_and_install(state, session_id).await?;
      Ok(AnswerResultOut {
        session_id: session_id.to_string(),
        correct: true,
        feedback: if hint_used { FEEDBACK_CORRECT } else { FEEDBACK_CORRECT_NO_HINT }.into(),
        correct_answer: None,
        hint: None,
        next: Some(next),
        summary: None,
      })
    }
    SubmitOutcome::CorrectDone => {
      let summary = summary.expect("terminal session has a summary");
      run_practice_completion(state, session_id, &summary).await;
      Ok(AnswerResultOut {
        session_id: session_id.to_string(),
        correct: true,
        feedback: if hint_used { FEEDBACK_CORRECT } else { FEEDBACK_CORRECT_NO_HINT }.into(),
        correct_answer: None,
        hint: None,
        next: None,
        summary: Some(summary),
      })
    }
    SubmitOutcome::Incorrect => {
      let (correct_answer, hint) = reveal.expect("revealed state has a payload");
      Ok(AnswerResultOut {
        session_id: session_id.to_string(),
        correct: false,
        feedback: FEEDBACK_WRONG.into(),
        correct_answer: Some(correct_answer),
        hint: Some(hint),
        next: None,
        summary: None,
      })
    }
  }
}

/// Reveal the hint for the open round (counted once per round).
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn practice_hint(state: &AppState, session_id: &str) -> Result<String, ApiError> {
  let mut practice = state.practice.write().await;
  let session = practice
    .get_mut(session_id)
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
  session.request_hint().map_err(ApiError::InvalidAction)
}

/// Leave the wrong-answer review: next round or the terminal summary.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn advance_practice(state: &AppState, session_id: &str) -> Result<AdvanceOut, ApiError> {
  let (outcome, summary) = {
    let mut practice = state.practice.write().await;
    let session = practice
      .get_mut(session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
    let outcome = session.advance().map_err(ApiError::InvalidAction)?;
    (outcome, session.summary().cloned())
  };

  match outcome {
    AdvanceOutcome::Next => Ok(AdvanceOut::Round(fetch_and_install(state, session_id).await?)),
    AdvanceOutcome::Done => {
      let summary = summary.expect("terminal session has a summary");
      run_practice_completion(state, session_id, &summary).await;
      Ok(AdvanceOut::Summary(summary))
    }
  }
}

/// Fetch for the session's current difficulty and install. A source
/// failure installs the fail-soft placeholder instead of surfacing.
async fn fetch_and_install(state: &AppState, session_id: &str) -> Result<PracticeRoundOut, ApiError> {
  let (topic, subtopic, level) = {
    let practice = state.practice.read().await;
    let session = practice
      .get(session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
    (
      session.ctx.topic.clone(),
      session.ctx.subtopic.clone(),
      session.next_level(),
    )
  };

  let question = choose_or_placeholder(state, &topic, &subtopic, level).await;

  let mut practice = state.practice.write().await;
  let session = practice
    .get_mut(session_id)
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
  session
    .install_question(question)
    .map_err(ApiError::InvalidAction)?;
  Ok(round_out(session))
}

async fn next_question(state: &AppState, session: &AdaptiveSession) -> Question {
  choose_or_placeholder(state, &session.ctx.topic, &session.ctx.subtopic, session.next_level()).await
}

async fn choose_or_placeholder(
  state: &AppState,
  topic: &str,
  subtopic: &str,
  level: DifficultyLevel,
) -> Question {
  match state.choose_question(topic, subtopic, level).await {
    Ok(q) => q,
    Err(e) => {
      error!(target: "practice", %topic, error = %e, "Question fetch failed; serving placeholder");
      placeholder_question()
    }
  }
}

fn round_out(session: &AdaptiveSession) -> PracticeRoundOut {
  let question = session
    .current_question()
    .expect("round view requires an open question");
  PracticeRoundOut {
    session_id: session.id.clone(),
    round: session.total_rounds + 1,
    max_questions: session.max_questions,
    score: session.score,
    level: session.next_level().as_str().to_string(),
    question: to_out(question),
  }
}

/// Post-completion tasks for an adaptive session: one best-effort
/// persistence attempt. Failure is logged, never surfaced.
async fn run_practice_completion(state: &AppState, session_id: &str, summary: &SessionSummary) {
  let student_id = {
    let practice = state.practice.read().await;
    match practice.get(session_id) {
      Some(s) => s.ctx.student_id.clone(),
      None => return,
    }
  };

  let record = ScoreRecord {
    date: Utc::now(),
    mode: PracticeMode::Adaptive,
    subject: summary.topic.clone(),
    score: summary.score,
    total: summary.total_rounds,
    details: summary.attempts.clone(),
  };
  if let Err(e) = state.store.append_score(&student_id, record).await {
    error!(target: "practice", %student_id, error = %e, "Failed to save practice progress");
  }
  info!(target: "practice", %session_id, score = summary.score, total = summary.total_rounds, "Adaptive session complete");
}

// -------- Timed exam --------

#[instrument(level = "info", skip(state), fields(%student_id))]
pub async fn start_exam(
  state: &AppState,
  student_id: &str,
  count: Option<u32>,
  year_level: Option<String>,
) -> Result<ExamViewOut, ApiError> {
  if !state.store.exists(student_id).await {
    return Err(ApiError::UnknownStudent(student_id.to_string()));
  }

  let count = count.unwrap_or(state.session_cfg.exam_count).max(1);
  let year = year_level.unwrap_or_else(|| state.session_cfg.year_level.clone());

  let oa = state
    .openai
    .as_ref()
    .ok_or_else(|| ApiError::QuestionSource("no exam generator configured".into()))?;
  let questions = oa
    .generate_exam_batch(&state.prompts, count, &year)
    .await
    .map_err(ApiError::QuestionSource)?;

  let session = ExamSession::new(
    Uuid::new_v4().to_string(),
    student_id.to_string(),
    "numeracy".into(),
    questions,
    state.session_cfg.exam_duration_secs,
  );
  let session_id = session.id.clone();
  let view = exam_view_of(&session);
  info!(target: "practice", session = %session_id, total = view.total, "Timed exam started");
  state.exams.write().await.insert(session_id.clone(), session);

  // One countdown task per exam, spawned exactly once, after the session
  // is visible in the registry.
  let clock = tokio::spawn(run_exam_clock(state.clone(), session_id.clone()));
  if let Some(exam) = state.exams.write().await.get_mut(&session_id) {
    exam.ticker = Some(clock.abort_handle());
  }

  Ok(view)
}

/// The autonomous countdown: one decrement per elapsed second while the
/// exam is in progress. Exits when the session is gone or finished;
/// reaching zero routes into the shared finalize path.
async fn run_exam_clock(state: AppState, session_id: String) {
  let mut interval = tokio::time::interval(Duration::from_secs(1));
  interval.tick().await; // first tick completes immediately

  loop {
    interval.tick().await;
    let expired = {
      let mut exams = state.exams.write().await;
      match exams.get_mut(&session_id) {
        Some(exam) if !exam.is_finished() => exam.tick(),
        _ => break,
      }
    };
    if expired {
      info!(target: "practice", %session_id, "Exam clock reached zero; submitting");
      if let Err(e) = finalize_exam(&state, &session_id).await {
        error!(target: "practice", %session_id, error = %e, "Timeout finalize failed");
      }
      break;
    }
  }
}

#[instrument(level = "info", skip(state, answer), fields(%session_id, %index))]
pub async fn record_exam_answer(
  state: &AppState,
  session_id: &str,
  index: usize,
  answer: String,
) -> Result<ExamViewOut, ApiError> {
  let mut exams = state.exams.write().await;
  let exam = exams
    .get_mut(session_id)
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
  if exam.is_finished() {
    return Err(ApiError::InvalidAction("exam already submitted".into()));
  }
  exam.record_answer(index, answer).map_err(ApiError::BadRequest)?;
  Ok(exam_view_of(exam))
}

#[instrument(level = "info", skip(state, op), fields(%session_id))]
pub async fn navigate_exam(
  state: &AppState,
  session_id: &str,
  op: ExamNavigateIn,
) -> Result<ExamViewOut, ApiError> {
  let mut exams = state.exams.write().await;
  let exam = exams
    .get_mut(session_id)
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
  match op {
    ExamNavigateIn::Next => exam.next(),
    ExamNavigateIn::Prev => exam.prev(),
    ExamNavigateIn::Jump { index } => exam.jump(index).map_err(ApiError::BadRequest)?,
  }
  Ok(exam_view_of(exam))
}

pub async fn exam_view(state: &AppState, session_id: &str) -> Result<ExamViewOut, ApiError> {
  let exams = state.exams.read().await;
  let exam = exams
    .get(session_id)
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
  Ok(exam_view_of(exam))
}

/// The single finalize path, used by the manual submit and the countdown
/// alike. Idempotent: repeat calls return the existing result without
/// re-running the completion tasks.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn finalize_exam(state: &AppState, session_id: &str) -> Result<ExamResultOut, ApiError> {
  let (result, student_id, ticker, first_finalize) = {
    let mut exams = state.exams.write().await;
    let exam = exams
      .get_mut(session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;

    let first_finalize = exam.summary().is_none();
    exam.finalize();
    let result = exam_result_of(exam);
    (result, exam.student_id.clone(), exam.ticker.take(), first_finalize)
  };

  // Stop the countdown before anything else; no further ticks.
  if let Some(handle) = ticker {
    handle.abort();
  }

  if first_finalize {
    info!(target: "practice", %session_id, score = result.summary.score, total = result.summary.total_rounds, "Exam finalized");
    run_exam_completion(state, &student_id, &result.summary).await;
  }
  Ok(result)
}

/// Post-finalize tasks: exactly one persistence attempt and one
/// conditional achievement grant. Both best-effort; failures are logged
/// and never block the summary.
async fn run_exam_completion(state: &AppState, student_id: &str, summary: &SessionSummary) {
  let record = ScoreRecord {
    date: Utc::now(),
    mode: PracticeMode::TimedExam,
    subject: summary.topic.clone(),
    score: summary.score,
    total: summary.total_rounds,
    details: summary.attempts.clone(),
  };
  if let Err(e) = state.store.append_score(student_id, record).await {
    error!(target: "practice", %student_id, error = %e, "Failed to save exam progress");
  }

  if let Some((title, description)) = exam_achievement(
    summary.score,
    summary.total_rounds,
    state.session_cfg.achievement_min_percent,
  ) {
    match state.store.append_achievement(student_id, title, description).await {
      Ok(_) => info!(target: "practice", %student_id, %title, "Achievement granted"),
      Err(e) => error!(target: "practice", %student_id, error = %e, "Failed to grant achievement"),
    }
  }
}

fn exam_view_of(exam: &ExamSession) -> ExamViewOut {
  let question = &exam.questions[exam.current.min(exam.questions.len().saturating_sub(1))];
  ExamViewOut {
    session_id: exam.id.clone(),
    total: exam.questions.len(),
    current: exam.current,
    time_left: exam.time_left,
    answered: exam.answered_count(),
    finished: exam.is_finished(),
    question: to_out(question),
    current_answer: exam.answer_at(exam.current).map(|s| s.to_string()),
  }
}

fn exam_result_of(exam: &ExamSession) -> ExamResultOut {
  let summary = exam.summary().expect("finalized exam has a summary").clone();
  let review = exam
    .questions
    .iter()
    .zip(summary.attempts.iter())
    .enumerate()
    .map(|(index, (q, attempt))| ExamReviewItem {
      index,
      text: q.text.clone(),
      submitted: attempt.submitted.clone(),
      correct_answer: q.answer.clone(),
      correct: attempt.correct,
    })
    .collect();
  let percent = summary.percent();
  ExamResultOut {
    session_id: exam.id.clone(),
    summary,
    percent,
    review,
  }
}

// -------- Students --------

pub async fn load_profile(state: &AppState, student_id: &str) -> Result<StudentProfile, ApiError> {
  state
    .store
    .load(student_id)
    .await
    .ok_or_else(|| ApiError::UnknownStudent(student_id.to_string()))
}

/// Fold the persisted score history into the mastery dashboard.
#[instrument(level = "info", skip(state), fields(%student_id))]
pub async fn student_dashboard(state: &AppState, student_id: &str) -> Result<DashboardOut, ApiError> {
  let profile = load_profile(state, student_id).await?;
  let mut aggregator = ProgressAggregator::new();
  for record in &profile.score_history {
    aggregator.fold_record(record);
  }
  Ok(DashboardOut {
    progress: aggregator.report(),
    student: profile,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuestionKind, QuestionSource};

  async fn registered(state: &AppState, name: &str) -> String {
    state.store.register(name).await.expect("profile").id
  }

  async fn current_answer(state: &AppState, session_id: &str) -> String {
    let practice = state.practice.read().await;
    practice
      .get(session_id)
      .and_then(|s| s.current_question())
      .map(|q| q.answer.clone())
      .expect("open question")
  }

  #[tokio::test]
  async fn full_adaptive_session_persists_a_record() {
    let state = AppState::offline();
    let student_id = registered(&state, "Maya").await;

    let round = start_practice(&state, &student_id, "fractions", None, Some(3))
      .await
      .expect("start");
    assert_eq!(round.round, 1);
    assert_eq!(round.level, "easy");
    let session_id = round.session_id.clone();

    for n in 1..=3u32 {
      let answer = current_answer(&state, &session_id).await;
      let result = submit_practice_answer(&state, &session_id, &answer)
        .await
        .expect("submit");
      assert!(result.correct);
      if n < 3 {
        assert!(result.next.is_some());
      } else {
        let summary = result.summary.expect("terminal summary");
        assert_eq!(summary.score, 3);
        assert_eq!(summary.total_rounds, 3);
        assert_eq!(summary.rounds_solved_without_hint, 3);
      }
    }

    let profile = state.store.load(&student_id).await.expect("profile");
    assert_eq!(profile.score_history.len(), 1);
    assert_eq!(profile.score_history[0].mode, PracticeMode::Adaptive);
    assert_eq!(profile.score_history[0].subject, "fractions");
    assert_eq!(profile.score_history[0].score, 3);
  }

  #[tokio::test]
  async fn wrong_answer_reveals_then_advances() {
    let state = AppState::offline();
    let student_id = registered(&state, "Leo").await;
    let round = start_practice(&state, &student_id, "geometry", None, Some(2))
      .await
      .expect("start");
    let session_id = round.session_id.clone();

    let result = submit_practice_answer(&state, &session_id, "definitely wrong")
      .await
      .expect("submit");
    assert!(!result.correct);
    assert!(result.correct_answer.is_some());
    assert!(result.next.is_none());

    // Resubmission is blocked until the explicit advance.
    assert!(submit_practice_answer(&state, &session_id, "again").await.is_err());

    match advance_practice(&state, &session_id).await.expect("advance") {
      AdvanceOut::Round(next) => assert_eq!(next.round, 2),
      AdvanceOut::Summary(_) => panic!("session should continue"),
    }
  }

  #[tokio::test]
  async fn guards_reject_bad_submissions() {
    let state = AppState::offline();
    let student_id = registered(&state, "Ana").await;
    let round = start_practice(&state, &student_id, "decimals", None, None)
      .await
      .expect("start");

    assert!(matches!(
      submit_practice_answer(&state, &round.session_id, "   ").await,
      Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
      submit_practice_answer(&state, "missing", "4").await,
      Err(ApiError::UnknownSession(_))
    ));
    assert!(matches!(
      start_practice(&state, "nobody", "fractions", None, None).await,
      Err(ApiError::UnknownStudent(_))
    ));
  }

  #[tokio::test]
  async fn exam_needs_a_generator() {
    let state = AppState::offline();
    let student_id = registered(&state, "Maya").await;
    assert!(matches!(
      start_exam(&state, &student_id, Some(4), None).await,
      Err(ApiError::QuestionSource(_))
    ));
  }

  fn exam_question(id: &str, answer: &str) -> crate::domain::Question {
    crate::domain::Question {
      id: id.into(),
      kind: QuestionKind::Short,
      text: format!("question {id}"),
      options: Vec::new(),
      answer: answer.into(),
      hint: String::new(),
      diagram: None,
      source: QuestionSource::Generated,
    }
  }

  #[tokio::test]
  async fn exam_finalize_persists_and_grants_achievement_once() {
    let state = AppState::offline();
    let student_id = registered(&state, "Maya").await;

    let mut exam = ExamSession::new(
      "exam1".into(),
      student_id.clone(),
      "numeracy".into(),
      vec![exam_question("q1", "4"), exam_question("q2", "7")],
      3000,
    );
    exam.record_answer(0, " 4 ".into()).unwrap();
    exam.record_answer(1, "7".into()).unwrap();
    state.exams.write().await.insert(exam.id.clone(), exam);

    let result = finalize_exam(&state, "exam1").await.expect("finalize");
    assert_eq!(result.summary.score, 2);
    assert_eq!(result.percent, 100);
    assert_eq!(result.review.len(), 2);

    // Repeat finalize: same result, no duplicate side effects.
    let again = finalize_exam(&state, "exam1").await.expect("finalize");
    assert_eq!(again.summary.score, 2);

    let profile = state.store.load(&student_id).await.expect("profile");
    assert_eq!(profile.score_history.len(), 1);
    assert_eq!(profile.score_history[0].mode, PracticeMode::TimedExam);
    assert_eq!(profile.achievements.len(), 1);
    assert_eq!(profile.achievements[0].title, "Star Performer");

    // Answer edits after finalize are rejected.
    assert!(matches!(
      record_exam_answer(&state, "exam1", 0, "9".into()).await,
      Err(ApiError::InvalidAction(_))
    ));
  }

  #[tokio::test]
  async fn dashboard_folds_history() {
    let state = AppState::offline();
    let student_id = registered(&state, "Maya").await;
    for (score, total) in [(6u32, 10u32), (8, 10)] {
      state
        .store
        .append_score(
          &student_id,
          ScoreRecord {
            date: Utc::now(),
            mode: PracticeMode::Adaptive,
            subject: "fractions".into(),
            score,
            total,
            details: Vec::new(),
          },
        )
        .await
        .unwrap();
    }

    let dashboard = student_dashboard(&state, &student_id).await.expect("dashboard");
    assert_eq!(dashboard.progress.overall_percent, 70);
    assert_eq!(dashboard.progress.topics.len(), 1);
    assert_eq!(dashboard.progress.topics[0].percent, 70);
  }
}
