//! Adaptive drill session: an explicit state machine over question rounds.
//!
//! Transitions are pure and synchronous; all I/O (question fetch, answer
//! judging) happens in `logic.rs` between `begin_submit` and
//! `apply_verdict`, or between a `Fetching` state and `install_question`.
//! The `busy` flag keeps a single judge call outstanding per session.
//!
//! Round bookkeeping invariants:
//! - `rounds_solved_without_hint <= score <= total_rounds <= max_questions`
//! - a round increments `total_hints_used` at most once, and only for an
//!   explicit hint request, never for the forced reveal after a wrong
//!   answer
//! - `total_rounds` and `attempts` move together: an attempt is recorded
//!   in the same transition that counts the round

use crate::domain::{AnswerAttempt, DifficultyLevel, Question, SessionSummary};
use crate::policy;

/// Explicit session context threaded through the controller; there is no
/// ambient "current student".
#[derive(Clone, Debug)]
pub struct SessionCtx {
  pub student_id: String,
  pub topic: String,
  pub subtopic: String,
}

#[derive(Clone, Debug)]
pub enum AdaptiveState {
  /// A question fetch is due or outstanding.
  Fetching,
  /// A question is on screen; the student may ask for the hint or submit.
  AwaitingAnswer { question: Question, hint_shown: bool },
  /// Wrong answer: hint and correct answer are force-displayed; only an
  /// explicit advance leaves this state.
  Revealed { question: Question, hint_shown: bool },
  /// Terminal; the summary has been built.
  Complete,
}

/// What the orchestrator should do after a verdict is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Correct, more rounds to go: fetch the next question.
  CorrectNext,
  /// Correct on the final round: session complete.
  CorrectDone,
  /// Incorrect: session sits in `Revealed` until the student advances.
  Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
  Next,
  Done,
}

#[derive(Debug)]
pub struct AdaptiveSession {
  pub id: String,
  pub ctx: SessionCtx,
  pub max_questions: u32,
  pub score: u32,
  pub total_rounds: u32,
  pub total_hints_used: u32,
  pub rounds_solved_without_hint: u32,
  pub attempts: Vec<AnswerAttempt>,
  pub state: AdaptiveState,
  /// True while a judge call is outstanding; blocks a second submit.
  pub busy: bool,
  summary: Option<SessionSummary>,
}

impl AdaptiveSession {
  pub fn new(id: String, ctx: SessionCtx, max_questions: u32) -> Self {
    Self {
      id,
      ctx,
      max_questions: max_questions.max(1),
      score: 0,
      total_rounds: 0,
      total_hints_used: 0,
      rounds_solved_without_hint: 0,
      attempts: Vec::new(),
      state: AdaptiveState::Fetching,
      busy: false,
      summary: None,
    }
  }

  /// Difficulty for the next fetch. Recomputed from the live counters on
  /// every call; never cached across rounds.
  pub fn next_level(&self) -> DifficultyLevel {
    policy::next_level(self.score, self.total_rounds, self.total_hints_used)
  }

  pub fn current_question(&self) -> Option<&Question> {
    match &self.state {
      AdaptiveState::AwaitingAnswer { question, .. } | AdaptiveState::Revealed { question, .. } => {
        Some(question)
      }
      _ => None,
    }
  }

  /// Hint/answer payload while in `Revealed`.
  pub fn revealed(&self) -> Option<(&str, &str)> {
    match &self.state {
      AdaptiveState::Revealed { question, .. } => Some((question.answer.as_str(), question.hint.as_str())),
      _ => None,
    }
  }

  pub fn summary(&self) -> Option<&SessionSummary> {
    self.summary.as_ref()
  }

  /// Install a fetched (or placeholder) question, starting a fresh round
  /// with a clean hint flag.
  pub fn install_question(&mut self, question: Question) -> Result<(), String> {
    match self.state {
      AdaptiveState::Fetching => {
        self.state = AdaptiveState::AwaitingAnswer { question, hint_shown: false };
        Ok(())
      }
      _ => Err("no question fetch is pending".into()),
    }
  }

  /// Explicit hint request. The first request in a round counts toward
  /// `total_hints_used`; re-display within the round is free. Rejected
  /// while a submission is being judged, so "hint used before submit"
  /// stays literally true.
  pub fn request_hint(&mut self) -> Result<String, String> {
    if self.busy {
      return Err("an answer is already being evaluated".into());
    }
    match &mut self.state {
      AdaptiveState::AwaitingAnswer { question, hint_shown } => {
        if !*hint_shown {
          *hint_shown = true;
          self.total_hints_used += 1;
        }
        Ok(question.hint.clone())
      }
      _ => Err("no open question to hint".into()),
    }
  }

  /// Start a submission: validates state and input, marks the session
  /// busy, and hands back the question for the judge call.
  pub fn begin_submit(&mut self, answer: &str) -> Result<Question, String> {
    if answer.trim().is_empty() {
      return Err("empty answers are not submittable".into());
    }
    if self.busy {
      return Err("an answer is already being evaluated".into());
    }
    match &self.state {
      AdaptiveState::AwaitingAnswer { question, .. } => {
        self.busy = true;
        Ok(question.clone())
      }
      AdaptiveState::Revealed { .. } => Err("answer already revealed; advance to continue".into()),
      AdaptiveState::Fetching => Err("question still loading".into()),
      AdaptiveState::Complete => Err("session already complete".into()),
    }
  }

  /// Apply the judge's verdict for the submission started by
  /// `begin_submit`. Records the attempt and counts the round in the same
  /// transition, so the books never drift apart.
  pub fn apply_verdict(&mut self, submitted: &str, correct: bool) -> Result<SubmitOutcome, String> {
    self.busy = false;
    let (question, hint_shown) = match std::mem::replace(&mut self.state, AdaptiveState::Fetching) {
      AdaptiveState::AwaitingAnswer { question, hint_shown } => (question, hint_shown),
      other => {
        self.state = other;
        return Err("no submission in flight".into());
      }
    };

    self.total_rounds += 1;
    self.attempts.push(AnswerAttempt {
      question_id: question.id.clone(),
      submitted: submitted.to_string(),
      correct,
      hint_used: hint_shown,
    });

    if correct {
      self.score += 1;
      if !hint_shown {
        self.rounds_solved_without_hint += 1;
      }
      if self.total_rounds >= self.max_questions {
        self.finish();
        Ok(SubmitOutcome::CorrectDone)
      } else {
        // state already moved to Fetching above
        Ok(SubmitOutcome::CorrectNext)
      }
    } else {
      // Round is counted now; score never moves. The forced reveal does
      // not mark the round as hint-assisted.
      self.state = AdaptiveState::Revealed { question, hint_shown };
      Ok(SubmitOutcome::Incorrect)
    }
  }

  /// Leave the wrong-answer review. The round was already counted when
  /// the verdict was applied.
  pub fn advance(&mut self) -> Result<AdvanceOutcome, String> {
    match self.state {
      AdaptiveState::Revealed { .. } => {
        if self.total_rounds >= self.max_questions {
          self.finish();
          Ok(AdvanceOutcome::Done)
        } else {
          self.state = AdaptiveState::Fetching;
          Ok(AdvanceOutcome::Next)
        }
      }
      _ => Err("nothing to advance from".into()),
    }
  }

  fn finish(&mut self) {
    self.state = AdaptiveState::Complete;
    if self.summary.is_none() {
      self.summary = Some(SessionSummary {
        topic: self.ctx.topic.clone(),
        score: self.score,
        total_rounds: self.total_rounds,
        total_hints_used: self.total_hints_used,
        rounds_solved_without_hint: self.rounds_solved_without_hint,
        attempts: self.attempts.clone(),
      });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuestionKind, QuestionSource};
  use crate::seeds::placeholder_question;

  fn question(id: &str) -> Question {
    Question {
      id: id.into(),
      kind: QuestionKind::Short,
      text: "What is 1/2 of 8?".into(),
      options: Vec::new(),
      answer: "4".into(),
      hint: "Half means divide by 2.".into(),
      diagram: None,
      source: QuestionSource::Seed,
    }
  }

  fn session() -> AdaptiveSession {
    AdaptiveSession::new(
      "s1".into(),
      SessionCtx {
        student_id: "stu1".into(),
        topic: "fractions".into(),
        subtopic: String::new(),
      },
      10,
    )
  }

  fn run_round(s: &mut AdaptiveSession, n: u32, correct: bool) -> SubmitOutcome {
    s.install_question(question(&format!("q{n}"))).expect("install");
    s.begin_submit("4").expect("begin");
    s.apply_verdict("4", correct).expect("verdict")
  }

  #[test]
  fn ten_round_session_bookkeeping() {
    let mut s = session();

    // Rounds 1-8: correct, no hints.
    for n in 1..=8 {
      assert_eq!(run_round(&mut s, n, true), SubmitOutcome::CorrectNext);
    }

    // Round 9: wrong. The reveal shows the hint but does not count it.
    s.install_question(question("q9")).expect("install");
    s.begin_submit("7").expect("begin");
    assert_eq!(s.apply_verdict("7", false).expect("verdict"), SubmitOutcome::Incorrect);
    assert!(s.revealed().is_some());
    assert_eq!(s.total_rounds, 9);
    assert_eq!(s.score, 8);
    assert_eq!(s.advance().expect("advance"), AdvanceOutcome::Next);

    // Round 10: hint requested, then correct.
    s.install_question(question("q10")).expect("install");
    s.request_hint().expect("hint");
    s.begin_submit("4").expect("begin");
    assert_eq!(s.apply_verdict("4", true).expect("verdict"), SubmitOutcome::CorrectDone);

    let summary = s.summary().expect("summary");
    assert_eq!(summary.score, 9);
    assert_eq!(summary.total_rounds, 10);
    assert_eq!(summary.total_hints_used, 1);
    assert_eq!(summary.rounds_solved_without_hint, 8);
    assert_eq!(summary.attempts.len(), 10);
    assert!(summary.attempts[9].hint_used);
    assert!(!summary.attempts[8].correct);
  }

  #[test]
  fn counter_invariants_hold() {
    let mut s = session();
    for n in 1..=10 {
      if n % 3 == 0 {
        s.install_question(question(&format!("q{n}"))).unwrap();
        s.request_hint().unwrap();
        s.begin_submit("7").unwrap();
        s.apply_verdict("7", false).unwrap();
        s.advance().unwrap();
      } else {
        run_round(&mut s, n, true);
      }
      assert!(s.rounds_solved_without_hint <= s.score);
      assert!(s.score <= s.total_rounds);
      assert!(s.total_rounds <= s.max_questions);
    }
    assert!(matches!(s.state, AdaptiveState::Complete));
  }

  #[test]
  fn hint_counts_once_per_round() {
    let mut s = session();
    s.install_question(question("q1")).unwrap();
    s.request_hint().unwrap();
    s.request_hint().unwrap();
    s.request_hint().unwrap();
    assert_eq!(s.total_hints_used, 1);

    s.begin_submit("4").unwrap();
    s.apply_verdict("4", true).unwrap();
    s.install_question(question("q2")).unwrap();
    s.request_hint().unwrap();
    assert_eq!(s.total_hints_used, 2);
  }

  #[test]
  fn fetch_failure_placeholder_still_plays() {
    let mut s = session();
    s.install_question(placeholder_question()).expect("placeholder installs");
    assert!(s.current_question().is_some());
    // The placeholder has an empty answer, so no verdict can award credit
    // by accident; a wrong submission flows through the normal reveal.
    s.begin_submit("anything").expect("submittable");
    assert_eq!(s.apply_verdict("anything", false).unwrap(), SubmitOutcome::Incorrect);
    let (answer, hint) = s.revealed().expect("revealed");
    assert!(answer.is_empty() && hint.is_empty());
  }

  #[test]
  fn guards_reject_out_of_order_operations() {
    let mut s = session();

    // Nothing on screen yet.
    assert!(s.begin_submit("4").is_err());
    assert!(s.advance().is_err());
    assert!(s.request_hint().is_err());

    s.install_question(question("q1")).unwrap();
    assert!(s.install_question(question("dup")).is_err());

    // Empty input is never submittable.
    assert!(s.begin_submit("   ").is_err());

    // One outstanding judge call at a time; no hint mid-evaluation.
    s.begin_submit("4").unwrap();
    assert!(s.begin_submit("4").is_err());
    assert!(s.request_hint().is_err());
    s.apply_verdict("4", false).unwrap();

    // Revealed: resubmission is not allowed, only advance.
    assert!(s.begin_submit("4").is_err());
    s.advance().unwrap();
  }

  #[test]
  fn wrong_rounds_feed_the_difficulty_input() {
    let mut s = session();
    for n in 1..=4 {
      run_round(&mut s, n, true);
    }
    assert_eq!(s.next_level(), DifficultyLevel::Hard);

    // Two wrong rounds count toward the total like any other round.
    for n in 5..=6 {
      s.install_question(question(&format!("q{n}"))).unwrap();
      s.begin_submit("7").unwrap();
      s.apply_verdict("7", false).unwrap();
      s.advance().unwrap();
    }
    // 4/6 correct = 66.7 -> medium
    assert_eq!(s.next_level(), DifficultyLevel::Medium);
  }

  #[test]
  fn wrong_answer_on_final_round_completes_via_advance() {
    let mut s = session();
    for n in 1..=9 {
      run_round(&mut s, n, true);
    }
    s.install_question(question("q10")).unwrap();
    s.begin_submit("7").unwrap();
    assert_eq!(s.apply_verdict("7", false).unwrap(), SubmitOutcome::Incorrect);
    assert_eq!(s.advance().unwrap(), AdvanceOutcome::Done);

    let summary = s.summary().expect("summary");
    assert_eq!(summary.score, 9);
    assert_eq!(summary.total_rounds, 10);
  }
}
