//! Content store port definition.

use async_trait::async_trait;

use crate::domain::entities::{Memory, MemoryId, ScrapbookId};
use crate::domain::errors::ContentError;

/// Port for reading memories from the backing content service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStorePort: Send + Sync {
    /// Fetches one memory by id.
    async fn get_memory(&self, id: &MemoryId) -> Result<Memory, ContentError>;

    /// Lists the memories of a scrapbook, newest first.
    async fn list_memories(&self, scrapbook_id: &ScrapbookId) -> Result<Vec<Memory>, ContentError>;

    /// Lists memories whose title, description or location contains `text`.
    async fn search_memories(
        &self,
        scrapbook_id: &ScrapbookId,
        text: &str,
    ) -> Result<Vec<Memory>, ContentError> {
        let memories = self.list_memories(scrapbook_id).await?;
        Ok(memories.into_iter().filter(|m| m.matches(text)).collect())
    }
}
