//! Popular-question mining.
//!
//! Recent archived questions are grouped by (province, company). Small
//! groups (at most `clusters` members) are represented by every member;
//! larger groups are clustered and each centroid is represented by its
//! nearest member. Representatives may repeat across centroids.

pub mod kmeans;

use chrono::Duration;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{HandbookError, Result};
use crate::traits::{
    clock::Clock,
    store::{MetadataFilter, VectorStore},
};
use crate::types::config::MiningConfig;
use crate::types::question::{unix_seconds, PopularQuestion, UserQuestionRecord};

pub use kmeans::{euclidean, KMeans};

/// Mines popular questions from the question archive.
pub struct QuestionMiner<'a> {
    store: &'a dyn VectorStore,
    clock: &'a dyn Clock,
    config: MiningConfig,
}

impl<'a> QuestionMiner<'a> {
    pub fn new(store: &'a dyn VectorStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            config: MiningConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MiningConfig) -> Self {
        self.config = config;
        self
    }

    /// Questions archived within the window, oldest first.
    pub async fn recent_questions(&self) -> Result<Vec<UserQuestionRecord>> {
        let cutoff = Duration::try_days(self.config.window_days)
            .and_then(|window| self.clock.now().checked_sub_signed(window))
            .ok_or_else(|| {
                HandbookError::Config(format!("mining window of {} days is out of range", self.config.window_days))
            })?;
        let filter = MetadataFilter::at_least("created_at", unix_seconds(cutoff));

        let records = self.store.scan(&self.config.namespace, Some(&filter)).await?;
        let total = records.len();
        let questions: Vec<UserQuestionRecord> = records
            .into_iter()
            .filter_map(|r| UserQuestionRecord::from_record(r.values, &r.metadata))
            .collect();
        if questions.len() < total {
            warn!(skipped = total - questions.len(), "Skipped question records without text");
        }
        Ok(questions)
    }

    pub async fn mine(&self) -> Result<Vec<PopularQuestion>> {
        let questions = self.recent_questions().await?;
        let popular = popular_questions(&questions, &self.config);
        info!(
            questions = questions.len(),
            popular = popular.len(),
            window_days = self.config.window_days,
            "Mined popular questions"
        );
        Ok(popular)
    }
}

/// Pick representatives per (province, company) group, groups in
/// first-seen order.
pub fn popular_questions(questions: &[UserQuestionRecord], config: &MiningConfig) -> Vec<PopularQuestion> {
    let mut groups: IndexMap<(&str, &str), Vec<&UserQuestionRecord>> = IndexMap::new();
    for q in questions {
        groups
            .entry((q.province.as_str(), q.company.as_str()))
            .or_default()
            .push(q);
    }

    let mut popular = Vec::new();
    for ((province, company), members) in groups {
        let embeddings: Vec<Vec<f32>> = members.iter().map(|q| q.embedding.clone()).collect();
        let centroids = if members.len() <= config.clusters {
            embeddings
        } else {
            KMeans::fit(&embeddings, config.clusters, config.seed, config.max_iterations).centroids
        };
        debug!(province, company, members = members.len(), centroids = centroids.len(), "Group");

        for centroid in &centroids {
            if let Some(closest) = closest_member(&members, centroid) {
                popular.push(PopularQuestion {
                    province: province.to_string(),
                    company: company.to_string(),
                    text: closest.text.clone(),
                });
            }
        }
    }
    popular
}

/// Member nearest to `centroid`; ties go to the earliest member.
fn closest_member<'q>(members: &[&'q UserQuestionRecord], centroid: &[f32]) -> Option<&'q UserQuestionRecord> {
    let mut best: Option<(&'q UserQuestionRecord, f64)> = None;
    for &member in members {
        let d = euclidean(&member.embedding, centroid);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((member, d));
        }
    }
    best.map(|(m, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn question(text: &str, province: &str, company: &str, embedding: Vec<f32>, at: DateTime<Utc>) -> UserQuestionRecord {
        UserQuestionRecord {
            text: text.into(),
            embedding,
            province: province.into(),
            company: company.into(),
            created_at: at,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_small_group_returns_every_member() {
        let qs = vec![
            question("a", "Ontario", "", vec![0.0, 1.0], now()),
            question("b", "Ontario", "", vec![1.0, 0.0], now()),
        ];
        let popular = popular_questions(&qs, &MiningConfig::default());
        let texts: Vec<&str> = popular.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_large_group_returns_three() {
        let qs = vec![
            question("overtime 1", "Ontario", "", vec![0.0, 0.0], now()),
            question("overtime 2", "Ontario", "", vec![0.1, 0.0], now()),
            question("vacation", "Ontario", "", vec![10.0, 10.0], now()),
            question("sick days", "Ontario", "", vec![-10.0, 10.0], now()),
        ];
        let popular = popular_questions(&qs, &MiningConfig::default());
        assert_eq!(popular.len(), 3);
        assert!(popular.iter().all(|p| p.province == "Ontario" && p.company.is_empty()));

        let texts: Vec<&str> = popular.iter().map(|p| p.text.as_str()).collect();
        assert!(texts.contains(&"vacation") && texts.contains(&"sick days"));
    }

    #[test]
    fn test_groups_by_province_and_company() {
        let qs = vec![
            question("a", "Ontario", "", vec![0.0], now()),
            question("b", "Ontario", "Acme", vec![0.0], now()),
            question("c", "Alberta", "", vec![0.0], now()),
            question("d", "Ontario", "", vec![1.0], now()),
        ];
        let popular = popular_questions(&qs, &MiningConfig::default());
        let keys: Vec<(&str, &str, &str)> = popular
            .iter()
            .map(|p| (p.province.as_str(), p.company.as_str(), p.text.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Ontario", "", "a"),
                ("Ontario", "", "d"),
                ("Ontario", "Acme", "b"),
                ("Alberta", "", "c"),
            ]
        );
    }

    #[tokio::test]
    async fn test_window_out_of_range_is_config_error() {
        use crate::stores::MemoryVectorStore;
        use crate::testing::FixedClock;

        let store = MemoryVectorStore::new();
        let clock = FixedClock::new(now());
        for days in [i64::MAX, i64::MAX / 86_400, 400_000_000] {
            let err = QuestionMiner::new(&store, &clock)
                .with_config(MiningConfig::default().with_window_days(days))
                .mine()
                .await
                .unwrap_err();
            assert!(matches!(err, HandbookError::Config(_)), "days = {days}");
        }
    }

    #[test]
    fn test_ties_go_to_earliest_member() {
        let first = question("first", "Ontario", "", vec![1.0], now());
        let second = question("second", "Ontario", "", vec![1.0], now());
        let members = vec![&first, &second];
        assert_eq!(closest_member(&members, &[1.0]).unwrap().text, "first");
    }
}
