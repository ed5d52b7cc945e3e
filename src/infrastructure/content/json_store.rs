//! Scrapbook library read from a JSON file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::entities::{Memory, MemoryId, ScrapbookId};
use crate::domain::errors::ContentError;
use crate::domain::ports::ContentStorePort;

/// Library file layout: `{"scrapbooks": [{"id", "title", "memories": [...]}]}`.
#[derive(Debug, Deserialize)]
struct LibraryDto {
    #[serde(default)]
    scrapbooks: Vec<ScrapbookDto>,
}

#[derive(Debug, Deserialize)]
struct ScrapbookDto {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    memories: Vec<MemoryDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryDto {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: Option<String>,
    date: DateTime<Utc>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl MemoryDto {
    fn into_memory(self, scrapbook_id: &str) -> Memory {
        Memory {
            id: MemoryId::new(self.id),
            scrapbook_id: ScrapbookId::new(scrapbook_id),
            title: self.title,
            description: self.description,
            image_url: self.image_url.filter(|url| !url.is_empty()),
            date: self.date,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Scrapbook summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapbookSummary {
    /// Scrapbook identifier.
    pub id: ScrapbookId,
    /// Display title.
    pub title: String,
    /// Number of memories.
    pub memory_count: usize,
}

/// Read-only [`ContentStorePort`] over a library loaded into memory.
#[derive(Debug, Default)]
pub struct JsonContentStore {
    order: Vec<ScrapbookSummary>,
    memories: HashMap<ScrapbookId, Vec<Memory>>,
}

impl JsonContentStore {
    /// Reads the library at `path`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid library.
    pub async fn open(path: &Path) -> Result<Self, ContentError> {
        debug!(path = %path.display(), "Reading scrapbook library");
        let content = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            scrapbooks = store.order.len(),
            "Loaded scrapbook library"
        );
        Ok(store)
    }

    /// Parses a library document.
    ///
    /// # Errors
    /// Returns error if `json` is not a valid library.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let library: LibraryDto = serde_json::from_str(json)?;

        let mut store = Self::default();
        for scrapbook in library.scrapbooks {
            let mut memories: Vec<Memory> = scrapbook
                .memories
                .into_iter()
                .map(|m| m.into_memory(&scrapbook.id))
                .collect();
            memories.sort_by(|a, b| b.date.cmp(&a.date));

            let id = ScrapbookId::new(scrapbook.id);
            store.order.push(ScrapbookSummary {
                id: id.clone(),
                title: scrapbook.title,
                memory_count: memories.len(),
            });
            store.memories.insert(id, memories);
        }
        Ok(store)
    }

    /// Scrapbooks in library order.
    #[must_use]
    pub fn scrapbooks(&self) -> &[ScrapbookSummary] {
        &self.order
    }

    /// Returns true if the library contains `id`.
    #[must_use]
    pub fn has_scrapbook(&self, id: &ScrapbookId) -> bool {
        self.memories.contains_key(id)
    }
}

#[async_trait]
impl ContentStorePort for JsonContentStore {
    async fn get_memory(&self, id: &MemoryId) -> Result<Memory, ContentError> {
        self.memories
            .values()
            .flatten()
            .find(|m| m.id == *id)
            .cloned()
            .ok_or_else(|| ContentError::memory_not_found(id.as_str()))
    }

    async fn list_memories(&self, scrapbook_id: &ScrapbookId) -> Result<Vec<Memory>, ContentError> {
        self.memories
            .get(scrapbook_id)
            .cloned()
            .ok_or_else(|| ContentError::scrapbook_not_found(scrapbook_id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LIBRARY: &str = r#"{
        "scrapbooks": [
            {
                "id": "summer",
                "title": "Summer 2024",
                "memories": [
                    {
                        "id": "m1",
                        "title": "Harbour",
                        "imageUrl": "https://res.example.com/demo/upload/v1/harbour.jpg",
                        "date": "2024-06-01T10:00:00Z",
                        "location": "Lisbon"
                    },
                    {
                        "id": "m2",
                        "title": "Night market",
                        "description": "Street food everywhere",
                        "imageUrl": "",
                        "date": "2024-07-12T21:30:00Z"
                    },
                    {
                        "id": "m3",
                        "title": "Dunes",
                        "date": "2024-06-20T08:00:00Z"
                    }
                ]
            },
            { "id": "winter", "title": "Winter" }
        ]
    }"#;

    #[tokio::test]
    async fn test_lists_newest_first() {
        let store = JsonContentStore::from_json(LIBRARY).unwrap();

        let memories = store.list_memories(&ScrapbookId::new("summer")).await.unwrap();

        let ids: Vec<_> = memories.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3", "m1"]);
        assert!(memories.iter().all(|m| m.scrapbook_id.as_str() == "summer"));
    }

    #[tokio::test]
    async fn test_empty_image_url_is_none() {
        let store = JsonContentStore::from_json(LIBRARY).unwrap();

        let memory = store.get_memory(&MemoryId::new("m2")).await.unwrap();

        assert!(memory.image_url.is_none());
        assert_eq!(memory.description, "Street food everywhere");
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = JsonContentStore::from_json(LIBRARY).unwrap();

        let memory = store.get_memory(&MemoryId::new("nope")).await;
        let scrapbook = store.list_memories(&ScrapbookId::new("autumn")).await;

        assert!(matches!(memory, Err(ContentError::MemoryNotFound { .. })));
        assert!(scrapbook.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_uses_default_filter() {
        let store = JsonContentStore::from_json(LIBRARY).unwrap();

        let found = store
            .search_memories(&ScrapbookId::new("summer"), "lisbon")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "m1");
    }

    #[test]
    fn test_scrapbook_summaries_keep_file_order() {
        let store = JsonContentStore::from_json(LIBRARY).unwrap();

        let summaries = store.scrapbooks();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].title, "Summer 2024");
        assert_eq!(summaries[0].memory_count, 3);
        assert_eq!(summaries[1].memory_count, 0);
        assert!(store.has_scrapbook(&ScrapbookId::new("winter")));
    }

    #[test]
    fn test_malformed_library() {
        let result = JsonContentStore::from_json("{\"scrapbooks\": [{}]}");

        assert!(matches!(result, Err(ContentError::Parse(_))));
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIBRARY.as_bytes()).unwrap();

        let store = JsonContentStore::open(file.path()).await.unwrap();

        assert_eq!(store.scrapbooks().len(), 2);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = JsonContentStore::open(&dir.path().join("missing.json")).await;

        assert!(matches!(result, Err(ContentError::Io(_))));
    }
}
