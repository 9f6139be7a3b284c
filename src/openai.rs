//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request either plain text or a strict
//! JSON object. Calls are instrumented and log model names, latencies, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{instrument, info, error};

use crate::config::Prompts;
use crate::domain::{Question, QuestionKind, QuestionSource};
use crate::util::fill_template;
use uuid::Uuid;

/// Themed prompt groups for a full exam batch: one generation call per
/// focus area, then trim to the requested count.
const EXAM_FOCUS_AREAS: [&str; 4] = [
  "fractions and number lines",
  "geometry, area and perimeter",
  "data, graphs and charts",
  "measurement, problem solving and estimation",
];

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

/// Shape the generator is asked to produce for a single question.
#[derive(Deserialize)]
struct GenQuestion {
  #[serde(rename = "type")]
  kind: Option<String>,
  question: String,
  #[serde(default)]
  options: Vec<String>,
  #[serde(default)]
  answer: serde_json::Value,
  #[serde(default)]
  trick: String,
}

/// Shape of one exam-batch entry.
#[derive(Deserialize)]
struct GenExamQuestion {
  #[serde(rename = "type")]
  kind: Option<String>,
  text: String,
  #[serde(default)]
  options: Vec<String>,
  #[serde(default)]
  answer: serde_json::Value,
  #[serde(default)]
  diagram: Option<String>,
}

#[derive(Deserialize)]
struct GenExamBatch {
  questions: Vec<GenExamQuestion>,
}

/// Models happily emit numeric answers as JSON numbers; coerce to the
/// string form the rest of the app compares against.
fn answer_to_string(v: &serde_json::Value) -> String {
  match v {
    serde_json::Value::String(s) => s.clone(),
    serde_json::Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// Normalize the generator's type field: missing type means MCQ when
/// options are present, short answer otherwise.
fn normalize_kind(kind: Option<&str>, options: &[String]) -> QuestionKind {
  match kind.map(|k| k.to_lowercase()) {
    Some(k) if k == "mcq" => QuestionKind::Mcq,
    Some(k) if k == "short" => QuestionKind::Short,
    _ if !options.is_empty() => QuestionKind::Mcq,
    _ => QuestionKind::Short,
  }
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Plain-text chat completion. Used for the yes/no answer judge.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: None,
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "starpath-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "starpath-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate a single adaptive question for a topic at a difficulty.
  #[instrument(
    level = "info",
    skip(self, prompts),
    fields(%topic, %level, model = %self.strong_model)
  )]
  pub async fn generate_question(
    &self,
    prompts: &Prompts,
    topic: &str,
    subtopic: &str,
    level: &str,
  ) -> Result<Question, String> {
    let subtopic = if subtopic.is_empty() { "general" } else { subtopic };
    let user = fill_template(
      &prompts.question_user_template,
      &[("topic", topic), ("subtopic", subtopic), ("level", level)],
    );

    let start = std::time::Instant::now();
    let result = self
      .chat_json::<GenQuestion>(&self.strong_model, &prompts.question_system, &user, 0.7)
      .await;
    let elapsed = start.elapsed();

    let gen = match result {
      Ok(g) => {
        info!(?elapsed, "Model response received successfully");
        g
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during question generation");
        return Err(format!("Model generation failed: {e}"));
      }
    };

    let kind = normalize_kind(gen.kind.as_deref(), &gen.options);
    let q = Question {
      id: Uuid::new_v4().to_string(),
      kind,
      text: gen.question,
      options: gen.options,
      answer: answer_to_string(&gen.answer),
      hint: gen.trick,
      diagram: None,
      source: QuestionSource::Generated,
    };

    info!(
      question_id = %q.id,
      text_preview = %q.text.chars().take(40).collect::<String>(),
      "Adaptive question generated"
    );
    Ok(q)
  }

  /// Ask the judge whether the student's answer is mathematically
  /// equivalent to the correct one. Single-word yes/no protocol.
  #[instrument(level = "info", skip(self, prompts, question, student_answer, correct_answer),
               fields(question_len = question.len(), answer_len = student_answer.len(), model = %self.fast_model))]
  pub async fn check_answer(
    &self,
    prompts: &Prompts,
    question: &str,
    student_answer: &str,
    correct_answer: &str,
  ) -> Result<bool, String> {
    let user = fill_template(
      &prompts.judge_user_template,
      &[
        ("question", question),
        ("student_answer", student_answer),
        ("correct_answer", correct_answer),
      ],
    );
    let verdict = self
      .chat_plain(&self.fast_model, &prompts.judge_system, &user, 0.1)
      .await?;
    Ok(verdict.trim().to_lowercase().starts_with("yes"))
  }

  /// Generate a full exam batch: one call per focus area, concatenated
  /// and trimmed to the requested count. Any failed call fails the batch
  /// (the caller surfaces a retryable error).
  #[instrument(level = "info", skip(self, prompts), fields(%count, %year_level, model = %self.strong_model))]
  pub async fn generate_exam_batch(
    &self,
    prompts: &Prompts,
    count: u32,
    year_level: &str,
  ) -> Result<Vec<Question>, String> {
    let batch_size = (count + EXAM_FOCUS_AREAS.len() as u32 - 1) / EXAM_FOCUS_AREAS.len() as u32;
    let mut all = Vec::with_capacity(count as usize);

    for focus in EXAM_FOCUS_AREAS {
      let remaining = count.saturating_sub(all.len() as u32);
      if remaining == 0 {
        break;
      }
      let ask = batch_size.min(remaining);
      let user = fill_template(
        &prompts.exam_user_template,
        &[
          ("count", &ask.to_string()),
          ("year", year_level),
          ("focus", focus),
        ],
      );
      let batch = self
        .chat_json::<GenExamBatch>(&self.strong_model, &prompts.exam_system, &user, 0.8)
        .await?;
      info!(%focus, generated = batch.questions.len(), "Exam batch segment generated");

      for gen in batch.questions {
        let kind = normalize_kind(gen.kind.as_deref(), &gen.options);
        all.push(Question {
          id: Uuid::new_v4().to_string(),
          kind,
          text: gen.text,
          options: gen.options,
          answer: answer_to_string(&gen.answer),
          hint: String::new(),
          diagram: gen.diagram,
          source: QuestionSource::Generated,
        });
      }
    }

    all.truncate(count as usize);
    if all.is_empty() {
      return Err("exam generator returned no questions".into());
    }
    Ok(all)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_normalization_follows_options() {
    assert_eq!(normalize_kind(Some("MCQ"), &[]), QuestionKind::Mcq);
    assert_eq!(normalize_kind(Some("short"), &[]), QuestionKind::Short);
    assert_eq!(normalize_kind(None, &["a".into(), "b".into()]), QuestionKind::Mcq);
    assert_eq!(normalize_kind(None, &[]), QuestionKind::Short);
    assert_eq!(normalize_kind(Some("weird"), &[]), QuestionKind::Short);
  }

  #[test]
  fn numeric_answers_coerce_to_strings() {
    assert_eq!(answer_to_string(&serde_json::json!("3/4")), "3/4");
    assert_eq!(answer_to_string(&serde_json::json!(42)), "42");
    assert_eq!(answer_to_string(&serde_json::json!(0.5)), "0.5");
    assert_eq!(answer_to_string(&serde_json::Value::Null), "");
  }
}
