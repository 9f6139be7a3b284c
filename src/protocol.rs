//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Questions leave the server redacted (`QuestionOut` has no answer and no
//! hint); the answer surfaces only in a wrong-answer reveal or the exam
//! review after finalize.

use serde::{Deserialize, Serialize};

use crate::domain::{Question, QuestionKind, SessionSummary, StudentProfile};
use crate::progress::ProgressReport;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Register {
        name: String,
    },
    Profile {
        #[serde(rename = "studentId")]
        student_id: String,
    },
    StartPractice {
        #[serde(rename = "studentId")]
        student_id: String,
        topic: String,
        #[serde(default)]
        subtopic: Option<String>,
        #[serde(default, rename = "maxQuestions")]
        max_questions: Option<u32>,
    },
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        answer: String,
    },
    Hint {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Advance {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    StartExam {
        #[serde(rename = "studentId")]
        student_id: String,
        #[serde(default)]
        count: Option<u32>,
        #[serde(default, rename = "yearLevel")]
        year_level: Option<String>,
    },
    ExamAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        index: usize,
        answer: String,
    },
    ExamNavigate {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(flatten)]
        op: ExamNavigateIn,
    },
    ExamView {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    ExamSubmit {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Student {
        profile: StudentProfile,
    },
    PracticeRound {
        round: PracticeRoundOut,
    },
    AnswerResult {
        result: AnswerResultOut,
    },
    Hint {
        text: String,
    },
    PracticeComplete {
        summary: SessionSummary,
    },
    ExamState {
        exam: ExamViewOut,
    },
    ExamFinished {
        result: ExamResultOut,
    },
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for question delivery. Deliberately
/// excludes `answer` and `hint`.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub kind: QuestionKind,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
}

/// Convert full `Question` (internal) to the public DTO.
pub fn to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        kind: q.kind,
        text: q.text.clone(),
        options: q.options.clone(),
        diagram: q.diagram.clone(),
    }
}

/// One adaptive round as presented to the student.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRoundOut {
    pub session_id: String,
    /// 1-based number of the round now on screen.
    pub round: u32,
    pub max_questions: u32,
    pub score: u32,
    pub level: String,
    pub question: QuestionOut,
}

/// Verdict payload for one submission.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultOut {
    pub session_id: String,
    pub correct: bool,
    pub feedback: String,
    /// Present only after a wrong answer: the forced reveal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Next round, when the session continues immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PracticeRoundOut>,
    /// Terminal summary, when this submission ended the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

/// Either the next round or the terminal summary after an advance.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvanceOut {
    Round(PracticeRoundOut),
    Summary(SessionSummary),
}

/// Live exam view: navigation state, clock and the current question.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamViewOut {
    pub session_id: String,
    pub total: usize,
    pub current: usize,
    pub time_left: u32,
    pub answered: usize,
    pub finished: bool,
    pub question: QuestionOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_answer: Option<String>,
}

/// Per-question line of the post-exam review.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamReviewItem {
    pub index: usize,
    pub text: String,
    pub submitted: String,
    pub correct_answer: String,
    pub correct: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultOut {
    pub session_id: String,
    pub summary: SessionSummary,
    pub percent: u32,
    pub review: Vec<ExamReviewItem>,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StartPracticeIn {
    #[serde(rename = "studentId")]
    pub student_id: String,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    #[serde(default, rename = "maxQuestions")]
    pub max_questions: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct StartExamIn {
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default, rename = "yearLevel")]
    pub year_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExamAnswerIn {
    pub index: usize,
    pub answer: String,
}

/// Free navigation: next, previous, or a jump to a 0-based index.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExamNavigateIn {
    Next,
    Prev,
    Jump { index: usize },
}

/// Direct progress append (the saveProgress collaborator surface).
#[derive(Debug, Deserialize)]
pub struct ProgressIn {
    pub score: u32,
    pub total: u32,
    pub mode: crate::domain::PracticeMode,
    pub subject: String,
    #[serde(default)]
    pub details: Vec<crate::domain::AnswerAttempt>,
}

#[derive(Debug, Deserialize)]
pub struct AchievementIn {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct DashboardOut {
    pub student: StudentProfile,
    pub progress: ProgressReport,
}
