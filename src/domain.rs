//! Domain models used by the backend: questions, attempts, session
//! summaries, and the persisted student profile schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty requested from the question source. Derived from the
/// session counters before every fetch, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
  Easy,
  Medium,
  Hard,
}

impl DifficultyLevel {
  /// Lowercase name used in prompt templates ("easy"/"medium"/"hard").
  pub fn as_str(&self) -> &'static str {
    match self {
      DifficultyLevel::Easy => "easy",
      DifficultyLevel::Medium => "medium",
      DifficultyLevel::Hard => "hard",
    }
  }
}

/// What shape of answer does the question expect?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Multiple choice: `options` holds the candidates.
  Mcq,
  /// Short answer: a number, fraction, or word.
  Short,
}

/// Where did we get the question from?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
  Generated,   // generated via OpenAI
  Seed,        // built-in bank (no OpenAI configured)
  Placeholder, // fetch failed; fail-soft stand-in with empty answer
}

/// One question as produced by the question source. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub kind: QuestionKind,
  pub text: String,
  /// MCQ candidates; empty for short-answer questions.
  #[serde(default)] pub options: Vec<String>,
  pub answer: String,
  #[serde(default)] pub hint: String,
  /// Natural-language description of a diagram, when the question needs
  /// one. Rendering it is a presentation concern.
  #[serde(default)] pub diagram: Option<String>,
  pub source: QuestionSource,
}

/// One answered round. Recorded exactly once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerAttempt {
  #[serde(rename = "questionId")]
  pub question_id: String,
  #[serde(rename = "submittedText")]
  pub submitted: String,
  #[serde(rename = "wasCorrect")]
  pub correct: bool,
  #[serde(rename = "hintUsedBeforeSubmit")]
  pub hint_used: bool,
}

/// Terminal artifact of a session, consumed by the progress aggregator
/// and persistence. Built exactly once at session termination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
  pub topic: String,
  pub score: u32,
  #[serde(rename = "totalRounds")]
  pub total_rounds: u32,
  #[serde(rename = "totalHintsUsed")]
  pub total_hints_used: u32,
  #[serde(rename = "roundsSolvedWithoutHint")]
  pub rounds_solved_without_hint: u32,
  #[serde(rename = "perQuestionDetail")]
  pub attempts: Vec<AnswerAttempt>,
}

impl SessionSummary {
  pub fn percent(&self) -> u32 {
    if self.total_rounds == 0 { 0 } else { (100 * self.score) / self.total_rounds }
  }
}

/// Which mode produced a persisted score record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PracticeMode {
  Adaptive,
  TimedExam,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Achievement {
  pub title: String,
  pub description: String,
  #[serde(rename = "grantedAt")]
  pub granted_at: DateTime<Utc>,
}

/// One entry of a student's score history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreRecord {
  pub date: DateTime<Utc>,
  pub mode: PracticeMode,
  pub subject: String,
  pub score: u32,
  pub total: u32,
  #[serde(default)] pub details: Vec<AnswerAttempt>,
}

/// Persisted student document. The core only appends to `achievements`
/// and `score_history`; history is never rewritten in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudentProfile {
  pub id: String,
  pub name: String,
  #[serde(rename = "createdAt")]
  pub created_at: DateTime<Utc>,
  #[serde(default)] pub achievements: Vec<Achievement>,
  #[serde(rename = "scoreHistory", default)]
  pub score_history: Vec<ScoreRecord>,
}
