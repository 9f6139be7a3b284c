//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Normalize an answer for the lenient exam comparison: trimmed and
/// lowercased. Exam answers are short MCQ/number literals, so string
/// equality after this is the whole check.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Lenient equality used by exam scoring and the local judge fallback.
/// Empty submissions never match anything.
pub fn answers_match(submitted: &str, expected: &str) -> bool {
  let sub = normalize_answer(submitted);
  if sub.is_empty() {
    return false;
  }
  sub == normalize_answer(expected)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_all_occurrences() {
    let out = fill_template("{topic} and {topic} at {level}", &[("topic", "fractions"), ("level", "easy")]);
    assert_eq!(out, "fractions and fractions at easy");
  }

  #[test]
  fn answer_matching_is_trimmed_and_case_insensitive() {
    assert!(answers_match("Paris ", "paris"));
    assert!(answers_match(" 3/4", "3/4"));
    assert!(!answers_match("", "paris"));
    assert!(!answers_match("   ", "paris"));
    assert!(!answers_match("london", "paris"));
  }
}
