//! Seed data: a built-in question bank so the app stays usable without
//! OpenAI, plus the fail-soft placeholder served when a fetch fails.

use uuid::Uuid;

use crate::domain::{DifficultyLevel, Question, QuestionKind, QuestionSource};

fn seed(
  id: &str,
  topic_level: DifficultyLevel,
  kind: QuestionKind,
  text: &str,
  options: &[&str],
  answer: &str,
  hint: &str,
) -> (DifficultyLevel, Question) {
  (
    topic_level,
    Question {
      id: id.into(),
      kind,
      text: text.into(),
      options: options.iter().map(|s| s.to_string()).collect(),
      answer: answer.into(),
      hint: hint.into(),
      diagram: None,
      source: QuestionSource::Seed,
    },
  )
}

/// Minimal per-topic bank that keeps every difficulty level answerable
/// when no question generator is configured.
pub fn seed_questions(topic: &str) -> Vec<(DifficultyLevel, Question)> {
  match topic.to_lowercase().as_str() {
    "fractions" => vec![
      seed("sf-e1", DifficultyLevel::Easy, QuestionKind::Short,
           "What is 1/2 of 8?", &[], "4",
           "Half of a number means dividing it by 2."),
      seed("sf-m1", DifficultyLevel::Medium, QuestionKind::Mcq,
           "Which fraction is equal to 2/4?", &["1/3", "1/2", "3/4", "2/3"], "1/2",
           "Divide the top and bottom by the same number."),
      seed("sf-h1", DifficultyLevel::Hard, QuestionKind::Short,
           "What is 3/5 of 40?", &[], "24",
           "Find one fifth first, then multiply by 3."),
    ],
    "geometry" => vec![
      seed("sg-e1", DifficultyLevel::Easy, QuestionKind::Mcq,
           "How many sides does a hexagon have?", &["4", "5", "6", "8"], "6",
           "\"Hex\" means six."),
      seed("sg-m1", DifficultyLevel::Medium, QuestionKind::Short,
           "A rectangle is 7 cm long and 3 cm wide. What is its perimeter in cm?", &[], "20",
           "Add all four sides: two lengths and two widths."),
      seed("sg-h1", DifficultyLevel::Hard, QuestionKind::Short,
           "A square has an area of 81 square cm. How long is one side in cm?", &[], "9",
           "Which number times itself gives 81?"),
    ],
    "decimals" => vec![
      seed("sd-e1", DifficultyLevel::Easy, QuestionKind::Short,
           "Write three tenths as a decimal.", &[], "0.3",
           "Tenths go in the first place after the decimal point."),
      seed("sd-m1", DifficultyLevel::Medium, QuestionKind::Mcq,
           "Which number is largest?", &["0.45", "0.6", "0.309", "0.59"], "0.6",
           "Compare the tenths digit first."),
      seed("sd-h1", DifficultyLevel::Hard, QuestionKind::Short,
           "What is 2.5 + 1.75?", &[], "4.25",
           "Line up the decimal points before adding."),
    ],
    "data" => vec![
      seed("st-e1", DifficultyLevel::Easy, QuestionKind::Short,
           "A tally chart shows IIII IIII for apples. How many apples is that?", &[], "9",
           "Each group of tallies is worth its count of strokes."),
      seed("st-m1", DifficultyLevel::Medium, QuestionKind::Mcq,
           "The scores 4, 6, 6, 8 were recorded. What is the mode?", &["4", "6", "8", "24"], "6",
           "The mode is the value that appears most often."),
      seed("st-h1", DifficultyLevel::Hard, QuestionKind::Short,
           "The mean of 3, 7, and 8 is what?", &[], "6",
           "Add the values, then divide by how many there are."),
    ],
    _ => vec![
      seed("sx-e1", DifficultyLevel::Easy, QuestionKind::Short,
           "What is 12 + 9?", &[], "21",
           "Make a ten first: 12 + 8 = 20."),
      seed("sx-m1", DifficultyLevel::Medium, QuestionKind::Short,
           "What is 7 × 8?", &[], "56",
           "Double 7 × 4."),
    ],
  }
}

/// Fail-soft stand-in installed when a question fetch fails: the session
/// keeps moving instead of crashing, and the empty answer means no
/// submission can be silently marked correct.
pub fn placeholder_question() -> Question {
  Question {
    id: Uuid::new_v4().to_string(),
    kind: QuestionKind::Short,
    text: "Error loading question. Please try again.".into(),
    options: Vec::new(),
    answer: String::new(),
    hint: String::new(),
    diagram: None,
    source: QuestionSource::Placeholder,
  }
}
