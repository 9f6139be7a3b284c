//! Progress aggregation: per-topic mastery tallies folded from completed
//! sessions, plus the achievement trigger shared by the controllers.
//!
//! Strictly additive; never recomputes history. A topic with no recorded
//! rounds renders as 0%, never as a division by zero.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{ScoreRecord, SessionSummary};

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TopicTally {
    pub correct: u32,
    pub total: u32,
}

impl TopicTally {
    pub fn percent(&self) -> u32 {
        if self.total == 0 { 0 } else { (100 * self.correct) / self.total }
    }
}

/// Running per-topic tallies. BTreeMap keeps dashboard output in a stable
/// order.
#[derive(Clone, Debug, Default)]
pub struct ProgressAggregator {
    tally: BTreeMap<String, TopicTally>,
}

#[derive(Debug, Serialize)]
pub struct TopicProgress {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    pub percent: u32,
}

#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub topics: Vec<TopicProgress>,
    #[serde(rename = "totalCorrect")]
    pub total_correct: u32,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
    #[serde(rename = "overallPercent")]
    pub overall_percent: u32,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed session into the tallies.
    pub fn fold_summary(&mut self, summary: &SessionSummary) {
        self.record(&summary.topic, summary.score, summary.total_rounds);
    }

    /// Fold one persisted score record (subject doubles as the topic key).
    pub fn fold_record(&mut self, record: &ScoreRecord) {
        self.record(&record.subject, record.score, record.total);
    }

    pub fn record(&mut self, topic: &str, correct: u32, total: u32) {
        let entry = self.tally.entry(topic.to_lowercase()).or_default();
        entry.correct += correct;
        entry.total += total;
    }

    pub fn topic_percent(&self, topic: &str) -> u32 {
        self.tally
            .get(&topic.to_lowercase())
            .map(|t| t.percent())
            .unwrap_or(0)
    }

    pub fn overall_percent(&self) -> u32 {
        let (correct, total) = self.totals();
        if total == 0 { 0 } else { (100 * correct) / total }
    }

    fn totals(&self) -> (u32, u32) {
        self.tally
            .values()
            .fold((0, 0), |(c, t), tally| (c + tally.correct, t + tally.total))
    }

    pub fn report(&self) -> ProgressReport {
        let (total_correct, total_questions) = self.totals();
        ProgressReport {
            topics: self
                .tally
                .iter()
                .map(|(topic, tally)| TopicProgress {
                    topic: topic.clone(),
                    correct: tally.correct,
                    total: tally.total,
                    percent: tally.percent(),
                })
                .collect(),
            total_correct,
            total_questions,
            overall_percent: self.overall_percent(),
        }
    }
}

/// The one conditional achievement: a high exam score.
/// Returns the grant (title, description) when the threshold is met.
pub fn exam_achievement(score: u32, total: u32, min_percent: u32) -> Option<(&'static str, &'static str)> {
    if total == 0 {
        return None;
    }
    if 100 * score / total >= min_percent {
        Some((
            "Star Performer",
            "Scored above 95% on a NAPLAN practice test!",
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sessions_on_one_topic_accumulate() {
        let mut agg = ProgressAggregator::new();
        agg.record("fractions", 6, 10);
        agg.record("Fractions", 8, 10);

        assert_eq!(agg.topic_percent("fractions"), 70);
        assert_eq!(agg.overall_percent(), 70);

        let report = agg.report();
        assert_eq!(report.topics.len(), 1);
        assert_eq!(report.topics[0].correct, 14);
        assert_eq!(report.topics[0].total, 20);
    }

    #[test]
    fn empty_topics_render_zero_percent() {
        let mut agg = ProgressAggregator::new();
        agg.record("geometry", 0, 0);
        assert_eq!(agg.topic_percent("geometry"), 0);
        assert_eq!(agg.topic_percent("never-seen"), 0);
        assert_eq!(agg.overall_percent(), 0);
    }

    #[test]
    fn summaries_fold_like_raw_tallies() {
        let summary = SessionSummary {
            topic: "Decimals".into(),
            score: 7,
            total_rounds: 10,
            total_hints_used: 2,
            rounds_solved_without_hint: 5,
            attempts: Vec::new(),
        };
        let mut agg = ProgressAggregator::new();
        agg.fold_summary(&summary);
        agg.fold_summary(&summary);
        assert_eq!(agg.topic_percent("decimals"), 70);
    }

    #[test]
    fn achievement_threshold() {
        assert!(exam_achievement(38, 40, 95).is_some());
        assert!(exam_achievement(40, 40, 95).is_some());
        assert!(exam_achievement(37, 40, 95).is_none());
        assert!(exam_achievement(0, 0, 95).is_none());
    }
}
