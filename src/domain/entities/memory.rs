//! Scrapbook memory entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a single memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a new `MemoryId` from any string-like input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a scrapbook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapbookId(String);

impl ScrapbookId {
    /// Creates a new `ScrapbookId` from any string-like input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScrapbookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScrapbookId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A captured moment: one photo plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Memory identifier.
    pub id: MemoryId,
    /// Owning scrapbook.
    pub scrapbook_id: ScrapbookId,
    /// Title shown on the card.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Raw (unoptimized) image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// When the memory happened.
    pub date: DateTime<Utc>,
    /// Human readable location.
    #[serde(default)]
    pub location: Option<String>,
    /// Latitude of the location, if known.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the location, if known.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Memory {
    /// Creates a memory with the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        scrapbook_id: impl Into<String>,
        title: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MemoryId::new(id),
            scrapbook_id: ScrapbookId::new(scrapbook_id),
            title: title.into(),
            description: String::new(),
            image_url: None,
            date,
            location: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Sets the image URL.
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Sets the location label.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true if the title, description or location contains `needle`
    /// (case-insensitive).
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .location
                .as_ref()
                .is_some_and(|l| l.to_lowercase().contains(&needle))
    }
}

/// Anything that carries a prefetchable image.
pub trait PrefetchSource {
    /// Raw image URL, if the item has one.
    fn image_url(&self) -> Option<&str>;
}

impl PrefetchSource for Memory {
    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }
}

impl PrefetchSource for String {
    fn image_url(&self) -> Option<&str> {
        Some(self.as_str()).filter(|url| !url.is_empty())
    }
}

impl PrefetchSource for &str {
    fn image_url(&self) -> Option<&str> {
        Some(*self).filter(|url| !url.is_empty())
    }
}
