//! Timed exam session: a fixed question batch under a countdown, with
//! free navigation and answer edits until one finalize path closes it.
//!
//! Manual submission and the countdown reaching zero both go through
//! `finalize`; there is no separate timeout code path. Once `Finished`,
//! answers are immutable and further ticks are no-ops.

use tokio::task::AbortHandle;

use crate::domain::{AnswerAttempt, Question, SessionSummary};
use crate::util::answers_match;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExamState {
  InProgress,
  Finished,
}

#[derive(Debug)]
pub struct ExamSession {
  pub id: String,
  pub student_id: String,
  pub subject: String,
  pub questions: Vec<Question>,
  answers: Vec<Option<String>>,
  pub current: usize,
  /// Seconds remaining. Decremented once per elapsed second while
  /// `InProgress`; never goes negative.
  pub time_left: u32,
  pub state: ExamState,
  summary: Option<SessionSummary>,
  /// Handle of the countdown task; aborted on finalize so no further
  /// ticks are scheduled.
  pub ticker: Option<AbortHandle>,
}

impl ExamSession {
  pub fn new(id: String, student_id: String, subject: String, questions: Vec<Question>, duration_secs: u32) -> Self {
    let n = questions.len();
    Self {
      id,
      student_id,
      subject,
      questions,
      answers: vec![None; n],
      current: 0,
      time_left: duration_secs,
      state: ExamState::InProgress,
      summary: None,
      ticker: None,
    }
  }

  pub fn is_finished(&self) -> bool {
    self.state == ExamState::Finished
  }

  pub fn answered_count(&self) -> usize {
    self.answers.iter().filter(|a| a.is_some()).count()
  }

  pub fn answer_at(&self, index: usize) -> Option<&str> {
    self.answers.get(index).and_then(|a| a.as_deref())
  }

  /// Record or edit the answer at an index. Valid at any index while the
  /// exam is in progress; rejected once finished.
  pub fn record_answer(&mut self, index: usize, answer: String) -> Result<(), String> {
    if self.is_finished() {
      return Err("exam already submitted".into());
    }
    match self.answers.get_mut(index) {
      Some(slot) => {
        *slot = Some(answer);
        Ok(())
      }
      None => Err(format!("question index {index} out of range")),
    }
  }

  pub fn next(&mut self) {
    self.current = (self.current + 1).min(self.questions.len().saturating_sub(1));
  }

  pub fn prev(&mut self) {
    self.current = self.current.saturating_sub(1);
  }

  pub fn jump(&mut self, index: usize) -> Result<(), String> {
    if index < self.questions.len() {
      self.current = index;
      Ok(())
    } else {
      Err(format!("question index {index} out of range"))
    }
  }

  /// One countdown step. Returns true when the clock has run out and the
  /// caller must route into the finalize path. No-op once finished.
  pub fn tick(&mut self) -> bool {
    if self.is_finished() {
      return false;
    }
    self.time_left = self.time_left.saturating_sub(1);
    self.time_left == 0
  }

  /// The single finalize path, shared by manual submit and timeout.
  /// Idempotent: a second call returns the existing summary unchanged.
  pub fn finalize(&mut self) -> &SessionSummary {
    if self.summary.is_none() {
      self.state = ExamState::Finished;

      let mut score = 0u32;
      let mut attempts = Vec::with_capacity(self.questions.len());
      for (idx, q) in self.questions.iter().enumerate() {
        let submitted = self.answers[idx].clone().unwrap_or_default();
        let correct = answers_match(&submitted, &q.answer);
        if correct {
          score += 1;
        }
        attempts.push(AnswerAttempt {
          question_id: q.id.clone(),
          submitted,
          correct,
          hint_used: false,
        });
      }

      self.summary = Some(SessionSummary {
        topic: self.subject.clone(),
        score,
        total_rounds: self.questions.len() as u32,
        total_hints_used: 0,
        rounds_solved_without_hint: score,
        attempts,
      });
    }
    self.summary.as_ref().expect("summary built above")
  }

  pub fn summary(&self) -> Option<&SessionSummary> {
    self.summary.as_ref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuestionKind, QuestionSource};

  fn question(id: &str, text: &str, answer: &str) -> Question {
    Question {
      id: id.into(),
      kind: QuestionKind::Short,
      text: text.into(),
      options: Vec::new(),
      answer: answer.into(),
      hint: String::new(),
      diagram: None,
      source: QuestionSource::Generated,
    }
  }

  fn exam(duration: u32) -> ExamSession {
    ExamSession::new(
      "e1".into(),
      "stu1".into(),
      "numeracy".into(),
      vec![
        question("q1", "Capital of France?", "paris"),
        question("q2", "What is 6 x 7?", "42"),
        question("q3", "What is 1/2 as a decimal?", "0.5"),
      ],
      duration,
    )
  }

  #[test]
  fn manual_submit_and_timeout_share_one_finalize_path() {
    let mut by_submit = exam(3000);
    by_submit.record_answer(0, "Paris ".into()).unwrap();
    by_submit.record_answer(1, "41".into()).unwrap();
    let manual = by_submit.finalize().clone();
    assert!(by_submit.time_left > 0);

    let mut by_timeout = exam(3);
    by_timeout.record_answer(0, "Paris ".into()).unwrap();
    by_timeout.record_answer(1, "41".into()).unwrap();
    let mut ran_out = false;
    for _ in 0..3 {
      ran_out = by_timeout.tick();
    }
    assert!(ran_out);
    let timed = by_timeout.finalize().clone();

    assert_eq!(manual.score, timed.score);
    assert_eq!(manual.total_rounds, timed.total_rounds);
    assert_eq!(manual.attempts.len(), timed.attempts.len());
    for (a, b) in manual.attempts.iter().zip(timed.attempts.iter()) {
      assert_eq!(a.question_id, b.question_id);
      assert_eq!(a.correct, b.correct);
    }
    assert!(by_submit.is_finished() && by_timeout.is_finished());
  }

  #[test]
  fn scoring_is_trimmed_and_case_insensitive() {
    let mut e = exam(3000);
    e.record_answer(0, "  PARIS ".into()).unwrap();
    e.record_answer(1, " 42".into()).unwrap();
    e.record_answer(2, "".into()).unwrap(); // empty never matches
    let summary = e.finalize();
    assert_eq!(summary.score, 2);
    assert!(summary.attempts[0].correct);
    assert!(summary.attempts[1].correct);
    assert!(!summary.attempts[2].correct);
  }

  #[test]
  fn timer_stops_at_zero_and_after_finish() {
    let mut e = exam(2);
    assert!(!e.tick());
    assert!(e.tick());
    assert_eq!(e.time_left, 0);
    // Not yet finalized: a straggling tick still reports zero but the
    // clock never goes negative.
    assert!(e.tick());
    assert_eq!(e.time_left, 0);

    e.finalize();
    assert!(!e.tick());
    assert_eq!(e.time_left, 0);
  }

  #[test]
  fn no_answer_mutation_after_finish() {
    let mut e = exam(3000);
    e.record_answer(0, "paris".into()).unwrap();
    e.finalize();
    assert!(e.record_answer(1, "42".into()).is_err());
    assert_eq!(e.answer_at(1), None);
  }

  #[test]
  fn finalize_is_idempotent() {
    let mut e = exam(3000);
    e.record_answer(1, "42".into()).unwrap();
    let first = e.finalize().clone();
    e.record_answer(0, "paris".into()).ok(); // rejected, but try anyway
    let second = e.finalize().clone();
    assert_eq!(first.score, second.score);
    assert_eq!(first.attempts.len(), second.attempts.len());
  }

  #[test]
  fn navigation_clamps_to_range() {
    let mut e = exam(3000);
    e.prev();
    assert_eq!(e.current, 0);
    e.next();
    e.next();
    e.next();
    e.next();
    assert_eq!(e.current, 2);
    e.jump(1).unwrap();
    assert_eq!(e.current, 1);
    assert!(e.jump(9).is_err());
  }
}
