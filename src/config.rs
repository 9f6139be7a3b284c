//! Loading application configuration (prompts + session defaults) from TOML.
//!
//! See `AppConfig`, `Prompts` and `SessionDefaults` for the expected schema.

use serde::Deserialize;
use tracing::{info, error};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub session: SessionDefaults,
}

/// Prompts used by the OpenAI client. Defaults are tuned for Year 5
/// NAPLAN-style numeracy. Override them in TOML to retune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Single adaptive question generation
  pub question_system: String,
  pub question_user_template: String,
  // Answer equivalence check
  pub judge_system: String,
  pub judge_user_template: String,
  // Full exam batch generation (one call per focus area)
  pub exam_system: String,
  pub exam_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are a primary-school numeracy question generator. Respond ONLY with strict JSON.".into(),
      question_user_template: "Generate a Grade 5 NAPLAN-style math question for the topic: {topic}, subtopic: {subtopic}.\nLevel: {level}.\nRandomly choose either a multiple choice or short answer format.\n- If multiple choice, provide 4 options and indicate the correct one.\n- If short answer, require a number or fraction.\nReturn JSON: { \"type\": \"mcq\" or \"short\", \"question\": \"...\", \"options\": [if MCQ], \"answer\": \"...\", \"trick\": \"a smart hint for solving it\" }\nOnly output valid JSON, no explanation.".into(),
      judge_system: "You are a strict but fair primary-school maths marker. Answer with a single word.".into(),
      judge_user_template: "A student was asked: \"{question}\"\nThe correct answer is: \"{correct_answer}\"\nThe student's answer is: \"{student_answer}\"\nIs the student's answer mathematically equivalent to the correct answer? Respond only with \"yes\" or \"no\".".into(),
      exam_system: "You are a NAPLAN numeracy test generator. Respond ONLY with strict JSON.".into(),
      exam_user_template: "Generate {count} unique {year} NAPLAN Numeracy questions on {focus}.\n- Mix multiple choice and short answer.\n- At least 2 must include a \"diagram\" field describing the visual (number line, shape, chart, or marked object).\n- Do not repeat names, numbers, or formats.\nReturn JSON: { \"questions\": [ { \"type\": \"mcq\" or \"short\", \"text\": \"...\", \"options\": [if MCQ], \"answer\": \"...\", \"diagram\": \"if needed, a clear description\" } ] }".into(),
    }
  }
}

/// Session tunables. All have production defaults; TOML may override.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionDefaults {
  /// Rounds per adaptive drill session.
  #[serde(default = "default_max_questions")]
  pub max_questions: u32,
  /// Questions per timed exam.
  #[serde(default = "default_exam_count")]
  pub exam_count: u32,
  /// Exam countdown, in seconds (50 minutes).
  #[serde(default = "default_exam_duration_secs")]
  pub exam_duration_secs: u32,
  /// Year level fed to the exam generator.
  #[serde(default = "default_year_level")]
  pub year_level: String,
  /// Minimum exam percentage that grants the high-score achievement.
  #[serde(default = "default_achievement_min_percent")]
  pub achievement_min_percent: u32,
}

fn default_max_questions() -> u32 { 10 }
fn default_exam_count() -> u32 { 40 }
fn default_exam_duration_secs() -> u32 { 50 * 60 }
fn default_year_level() -> String { "year 5".into() }
fn default_achievement_min_percent() -> u32 { 95 }

impl Default for SessionDefaults {
  fn default() -> Self {
    Self {
      max_questions: default_max_questions(),
      exam_count: default_exam_count(),
      exam_duration_secs: default_exam_duration_secs(),
      year_level: default_year_level(),
      achievement_min_percent: default_achievement_min_percent(),
    }
  }
}

/// Attempt to load `AppConfig` from STARPATH_CONFIG_PATH. On any
/// parsing/IO error, returns None and the defaults apply.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("STARPATH_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "starpath_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "starpath_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "starpath_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
