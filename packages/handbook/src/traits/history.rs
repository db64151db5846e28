//! Per-thread conversation persistence.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::conversation::Turn;

/// Append-only storage of conversation turns keyed by thread id.
///
/// Turns are never rewritten. Concurrent appends to one thread are not
/// coordinated.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All turns of a thread, oldest first. Unknown threads are empty.
    async fn get(&self, thread_id: &str) -> Result<Vec<Turn>>;

    async fn append(&self, thread_id: &str, turns: Vec<Turn>) -> Result<()>;
}
