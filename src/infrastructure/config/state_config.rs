use serde::{Deserialize, Serialize};

/// Session state configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Last opened scrapbook ID.
    #[serde(default)]
    pub last_scrapbook_id: Option<String>,

    /// Index of the last focused memory.
    #[serde(default)]
    pub last_memory_index: Option<usize>,
}

impl StateConfig {
    /// Focus index to resume at when reopening `scrapbook_id`.
    #[must_use]
    pub fn resume_index(&self, scrapbook_id: &str) -> usize {
        if self.last_scrapbook_id.as_deref() == Some(scrapbook_id) {
            self.last_memory_index.unwrap_or(0)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_index_only_for_same_scrapbook() {
        let state = StateConfig {
            last_scrapbook_id: Some("summer".to_string()),
            last_memory_index: Some(4),
        };

        assert_eq!(state.resume_index("summer"), 4);
        assert_eq!(state.resume_index("winter"), 0);
        assert_eq!(StateConfig::default().resume_index("summer"), 0);
    }
}
