//! Swipe-through browsing of a scrapbook's memories.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::services::{Refocus, WindowedPrefetchCache};
use crate::domain::entities::{Memory, MemoryId, PrefetchSource, ScrapbookId};
use crate::domain::errors::ContentError;
use crate::domain::ports::ContentStorePort;

/// Outcome of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Focus moved and the prefetch window followed.
    Moved {
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
        /// What the prefetch cache did.
        refocus: Refocus,
    },
    /// Focus is already at the requested end (or the list is empty).
    AtBoundary {
        /// Unchanged index.
        index: usize,
    },
}

/// Holds the loaded memories and the focused index of one scrapbook, and
/// keeps the prefetch window centered on it.
pub struct BrowseScrapbookUseCase {
    content: Arc<dyn ContentStorePort>,
    cache: Arc<WindowedPrefetchCache>,
    scrapbook_id: Option<ScrapbookId>,
    memories: Vec<Memory>,
    current: usize,
}

impl BrowseScrapbookUseCase {
    /// Creates an empty session.
    #[must_use]
    pub fn new(content: Arc<dyn ContentStorePort>, cache: Arc<WindowedPrefetchCache>) -> Self {
        Self {
            content,
            cache,
            scrapbook_id: None,
            memories: Vec::new(),
            current: 0,
        }
    }

    /// Loads a scrapbook and focuses `start_index` (clamped to the list).
    ///
    /// Returns the number of loaded memories.
    ///
    /// # Errors
    /// Returns error if the content store cannot list the scrapbook.
    pub async fn open(
        &mut self,
        scrapbook_id: &ScrapbookId,
        start_index: usize,
    ) -> Result<usize, ContentError> {
        debug!(scrapbook = %scrapbook_id, "Loading scrapbook memories");
        let memories = self.content.list_memories(scrapbook_id).await?;

        self.scrapbook_id = Some(scrapbook_id.clone());
        self.memories = memories;
        self.current = start_index.min(self.memories.len().saturating_sub(1));

        info!(
            scrapbook = %scrapbook_id,
            memories = self.memories.len(),
            index = self.current,
            "Opened scrapbook"
        );

        if !self.memories.is_empty() {
            self.cache.refocus_default(&self.memories, self.current);
        }

        Ok(self.memories.len())
    }

    /// Loads the scrapbook owning `memory_id` and focuses that memory.
    ///
    /// # Errors
    /// Returns error if the memory or its scrapbook cannot be loaded.
    pub async fn open_memory(&mut self, memory_id: &MemoryId) -> Result<usize, ContentError> {
        let memory = self.content.get_memory(memory_id).await?;
        let scrapbook_id = memory.scrapbook_id.clone();
        self.open(&scrapbook_id, 0).await?;

        let index = self
            .memories
            .iter()
            .position(|m| m.id == *memory_id)
            .ok_or_else(|| ContentError::memory_not_found(memory_id.as_str()))?;
        self.jump_to(index);
        Ok(index)
    }

    /// Focuses the next memory.
    pub fn next(&mut self) -> Navigation {
        if self.current + 1 >= self.memories.len() {
            return self.boundary();
        }
        self.move_to(self.current + 1)
    }

    /// Focuses the previous memory.
    pub fn previous(&mut self) -> Navigation {
        if self.current == 0 || self.memories.is_empty() {
            return self.boundary();
        }
        self.move_to(self.current - 1)
    }

    /// Focuses `index`, clamped to the list.
    pub fn jump_to(&mut self, index: usize) -> Navigation {
        if self.memories.is_empty() {
            return self.boundary();
        }
        let index = index.min(self.memories.len() - 1);
        if index == self.current {
            return self.boundary();
        }
        self.move_to(index)
    }

    /// Focuses the first loaded memory whose text matches `text`.
    ///
    /// Returns `None` when no scrapbook is open or nothing matches.
    ///
    /// # Errors
    /// Returns error if the content store search fails.
    pub async fn find(&mut self, text: &str) -> Result<Option<Navigation>, ContentError> {
        let Some(scrapbook_id) = self.scrapbook_id.clone() else {
            return Ok(None);
        };

        let hits = self.content.search_memories(&scrapbook_id, text).await?;
        let index = hits
            .iter()
            .find_map(|hit| self.memories.iter().position(|m| m.id == hit.id));

        debug!(scrapbook = %scrapbook_id, text, hits = hits.len(), ?index, "Searched memories");
        Ok(index.map(|index| self.jump_to(index)))
    }

    fn boundary(&self) -> Navigation {
        debug!(index = self.current, "Navigation at boundary");
        Navigation::AtBoundary {
            index: self.current,
        }
    }

    fn move_to(&mut self, to: usize) -> Navigation {
        let from = self.current;
        self.current = to;
        let refocus = self.cache.refocus_default(&self.memories, to);
        debug!(from, to, "Moved focus");
        Navigation::Moved { from, to, refocus }
    }

    /// Re-issues the prefetch window for the current focus.
    pub fn refresh(&self) -> Refocus {
        self.cache.refocus_default(&self.memories, self.current)
    }

    /// Drops settled preload records outside the current window.
    pub fn trim_cache(&self) -> usize {
        self.cache.retain_window(&self.memories, self.current)
    }

    /// Currently open scrapbook.
    #[must_use]
    pub const fn scrapbook_id(&self) -> Option<&ScrapbookId> {
        self.scrapbook_id.as_ref()
    }

    /// Loaded memories.
    #[must_use]
    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    /// Focused index.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// Focused memory.
    #[must_use]
    pub fn current(&self) -> Option<&Memory> {
        self.memories.get(self.current)
    }

    /// Delivery URL of the focused memory's image at `width` pixels.
    #[must_use]
    pub fn current_image_url(&self, width: u32) -> Option<String> {
        let raw = self.current()?.image_url()?;
        Some(self.cache.optimized_url(raw, width))
    }
}

impl std::fmt::Debug for BrowseScrapbookUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowseScrapbookUseCase")
            .field("scrapbook_id", &self.scrapbook_id)
            .field("memories", &self.memories.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
