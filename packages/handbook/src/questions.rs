//! Archive of anonymized user questions for popular-question mining.

use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::prompts::sanitize_question_prompt;
use crate::error::Result;
use crate::traits::{
    ai::{ChatModel, Embedder},
    clock::Clock,
    store::{VectorRecord, VectorStore},
};
use crate::types::config::USER_QUESTIONS_NAMESPACE;
use crate::types::conversation::Turn;
use crate::types::question::UserQuestionRecord;

/// Rewrites incoming messages into clean questions and stores them.
pub struct QuestionArchive<'a> {
    model: &'a dyn ChatModel,
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    clock: &'a dyn Clock,
    namespace: String,
}

impl<'a> QuestionArchive<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            model,
            embedder,
            store,
            clock,
            namespace: USER_QUESTIONS_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Ask the model for a single anonymized question. Empty when the
    /// model returns nothing usable.
    pub async fn sanitize(&self, message: &str) -> Result<String> {
        let reply = self
            .model
            .invoke(&[Turn::human(sanitize_question_prompt(message))])
            .await?;
        Ok(reply.content.trim().to_string())
    }

    /// Sanitize, embed and store `message`. Returns `None` when the
    /// sanitized question is empty and nothing was stored.
    pub async fn archive(&self, message: &str, province: &str, company: &str) -> Result<Option<UserQuestionRecord>> {
        let text = self.sanitize(message).await?;
        if text.is_empty() {
            debug!("No question to archive");
            return Ok(None);
        }

        let record = UserQuestionRecord {
            embedding: self.embedder.embed(&text).await?,
            text,
            province: province.to_string(),
            company: company.to_string(),
            created_at: self.clock.now(),
        };

        let vector = VectorRecord::new(
            Uuid::new_v4().to_string(),
            record.embedding.clone(),
            record.to_record_metadata(&self.namespace),
        );
        self.store.upsert(&self.namespace, vec![vector]).await?;

        info!(province, company, namespace = %self.namespace, "Archived user question");
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryVectorStore;
    use crate::testing::{FixedClock, MockChatModel, MockEmbedder};
    use crate::types::conversation::ModelReply;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_archive_stores_sanitized_question() {
        let model = MockChatModel::new().with_reply(ModelReply::text("  How much notice must I give before quitting?\n"));
        let embedder = MockEmbedder::new();
        let store = MemoryVectorStore::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap());
        let archive = QuestionArchive::new(&model, &embedder, &store, &clock);

        let record = archive
            .archive("hi I'm Sam, how much notice do i give b4 quitting", "Ontario", "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.text, "How much notice must I give before quitting?");

        let stored = store.scan("UserQuestions", None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].metadata["province"], "Ontario");
        assert_eq!(stored[0].metadata["company"], "");
        assert_eq!(stored[0].metadata["namespace"], "UserQuestions");
        assert_eq!(
            stored[0].metadata["created_at"].as_f64(),
            Some(clock.now().timestamp() as f64)
        );

        let prompt = &model.calls()[0].messages[0].content;
        assert!(prompt.contains("b4 quitting"));
    }

    #[tokio::test]
    async fn test_empty_question_not_stored() {
        let model = MockChatModel::new().with_reply(ModelReply::text("   "));
        let embedder = MockEmbedder::new();
        let store = MemoryVectorStore::new();
        let clock = FixedClock::new(Utc::now());
        let archive = QuestionArchive::new(&model, &embedder, &store, &clock);

        assert!(archive.archive("asdf", "Ontario", "").await.unwrap().is_none());
        assert_eq!(store.count("UserQuestions").await, 0);
        assert!(embedder.calls().is_empty());
    }
}
