//! Student store: an in-process document store keyed by student id.
//!
//! This is the persistence collaborator behind the save/load interface the
//! controllers use. Registration is find-or-create by name (the app has no
//! authentication; a name IS the identity). Score history and achievements
//! are append-only; the per-document write lock makes each append atomic.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Achievement, ScoreRecord, StudentProfile};

#[derive(Clone, Default)]
pub struct StudentStore {
    by_id: Arc<RwLock<HashMap<String, StudentProfile>>>,
    id_by_name: Arc<RwLock<HashMap<String, String>>>,
}

impl StudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register-or-login by name. Returns the existing profile when the
    /// trimmed name is already known, otherwise creates a fresh one.
    #[instrument(level = "info", skip(self), fields(%name))]
    pub async fn register(&self, name: &str) -> Option<StudentProfile> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(id) = { self.id_by_name.read().await.get(name).cloned() } {
            return self.by_id.read().await.get(&id).cloned();
        }

        let profile = StudentProfile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            achievements: Vec::new(),
            score_history: Vec::new(),
        };
        self.id_by_name
            .write()
            .await
            .insert(name.to_string(), profile.id.clone());
        self.by_id
            .write()
            .await
            .insert(profile.id.clone(), profile.clone());
        info!(target: "starpath_backend", id = %profile.id, "Registered new student");
        Some(profile)
    }

    /// Load a profile by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn load(&self, id: &str) -> Option<StudentProfile> {
        self.by_id.read().await.get(id).cloned()
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.by_id.read().await.contains_key(id)
    }

    /// Append one score record to a student's history.
    #[instrument(level = "info", skip(self, record), fields(%id, score = record.score, total = record.total))]
    pub async fn append_score(&self, id: &str, record: ScoreRecord) -> Result<(), String> {
        let mut by_id = self.by_id.write().await;
        match by_id.get_mut(id) {
            Some(profile) => {
                profile.score_history.push(record);
                Ok(())
            }
            None => Err(format!("unknown student: {id}")),
        }
    }

    /// Append one achievement to a student's profile.
    #[instrument(level = "info", skip(self, title, description), fields(%id))]
    pub async fn append_achievement(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> Result<Achievement, String> {
        let mut by_id = self.by_id.write().await;
        match by_id.get_mut(id) {
            Some(profile) => {
                let achievement = Achievement {
                    title: title.to_string(),
                    description: description.to_string(),
                    granted_at: Utc::now(),
                };
                profile.achievements.push(achievement.clone());
                Ok(achievement)
            }
            None => Err(format!("unknown student: {id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PracticeMode;

    #[tokio::test]
    async fn register_is_find_or_create() {
        let store = StudentStore::new();
        let first = store.register("Maya").await.expect("profile");
        let again = store.register("  Maya  ").await.expect("profile");
        assert_eq!(first.id, again.id);

        let other = store.register("Leo").await.expect("profile");
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let store = StudentStore::new();
        assert!(store.register("   ").await.is_none());
    }

    #[tokio::test]
    async fn history_is_append_only() {
        let store = StudentStore::new();
        let student = store.register("Maya").await.expect("profile");

        for (score, total) in [(6, 10), (8, 10)] {
            store
                .append_score(
                    &student.id,
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
                .expect("append");
        }

        let profile = store.load(&student.id).await.expect("profile");
        assert_eq!(profile.score_history.len(), 2);
        assert_eq!(profile.score_history[0].score, 6);
        assert_eq!(profile.score_history[1].score, 8);

        assert!(store
            .append_score(
                "nope",
                ScoreRecord {
                    date: Utc::now(),
                    mode: PracticeMode::TimedExam,
                    subject: "numeracy".into(),
                    score: 1,
                    total: 2,
                    details: Vec::new(),
                },
            )
            .await
            .is_err());
    }
}
