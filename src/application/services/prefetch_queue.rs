//! Priority queue of prefetches waiting for an execution slot.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::domain::entities::Priority;

#[derive(Debug, PartialEq, Eq)]
struct QueueEntry {
    priority: Priority,
    sequence: u64,
    url: String,
}

impl Ord for QueueEntry {
    // BinaryHeap pops the greatest entry: best band first, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Queued<T> {
    priority: Priority,
    sequence: u64,
    payload: T,
}

/// Waiting prefetches ordered by band, FIFO within a band.
///
/// Each URL is queued at most once. Upgrading a URL's band leaves a stale
/// heap entry behind that `pop` skips.
#[derive(Debug)]
pub struct PrefetchQueue<T> {
    heap: BinaryHeap<QueueEntry>,
    entries: HashMap<String, Queued<T>>,
    sequence: u64,
}

impl<T> Default for PrefetchQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            sequence: 0,
        }
    }
}

impl<T> PrefetchQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `url` is waiting.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Payload of a queued URL.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&T> {
        self.entries.get(url).map(|q| &q.payload)
    }

    /// Band of a queued URL.
    #[must_use]
    pub fn priority_of(&self, url: &str) -> Option<Priority> {
        self.entries.get(url).map(|q| q.priority)
    }

    /// Queues `url`. An already queued URL keeps its payload and is only
    /// upgraded when `priority` is better.
    pub fn push(&mut self, url: impl Into<String>, priority: Priority, payload: T) {
        let url = url.into();
        if self.entries.contains_key(&url) {
            self.upgrade(&url, priority);
            return;
        }

        let sequence = self.next_sequence();
        self.heap.push(QueueEntry {
            priority,
            sequence,
            url: url.clone(),
        });
        self.entries.insert(
            url,
            Queued {
                priority,
                sequence,
                payload,
            },
        );
    }

    /// Moves a queued URL into a better band, at the back of that band.
    ///
    /// Returns true if the band changed.
    pub fn upgrade(&mut self, url: &str, priority: Priority) -> bool {
        let sequence = self.sequence.wrapping_add(1);
        let Some(queued) = self.entries.get_mut(url) else {
            return false;
        };
        if priority >= queued.priority {
            return false;
        }

        queued.priority = priority;
        queued.sequence = sequence;
        self.sequence = sequence;
        self.heap.push(QueueEntry {
            priority,
            sequence,
            url: url.to_string(),
        });
        true
    }

    /// Removes and returns the best waiting entry.
    pub fn pop(&mut self) -> Option<(String, Priority, T)> {
        while let Some(entry) = self.heap.pop() {
            let current = self
                .entries
                .get(&entry.url)
                .is_some_and(|q| q.sequence == entry.sequence);
            if !current {
                continue;
            }
            if let Some(queued) = self.entries.remove(&entry.url) {
                return Some((entry.url, queued.priority, queued.payload));
            }
        }
        None
    }

    /// Empties the queue, returning the URLs with their payloads.
    pub fn drain(&mut self) -> Vec<(String, T)> {
        self.heap.clear();
        self.entries.drain().map(|(url, q)| (url, q.payload)).collect()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn popped_urls(queue: &mut PrefetchQueue<()>) -> Vec<String> {
        std::iter::from_fn(|| queue.pop().map(|(url, _, ())| url)).collect()
    }

    #[test]
    fn test_serves_by_band_then_fifo() {
        let mut queue = PrefetchQueue::new();
        queue.push("low-1", Priority::Low, ());
        queue.push("high-1", Priority::High, ());
        queue.push("normal-1", Priority::Normal, ());
        queue.push("high-2", Priority::High, ());
        queue.push("low-2", Priority::Low, ());

        assert_eq!(
            popped_urls(&mut queue),
            vec!["high-1", "high-2", "normal-1", "low-1", "low-2"]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicate_push_keeps_single_entry() {
        let mut queue = PrefetchQueue::new();
        queue.push("a", Priority::Normal, 1);
        queue.push("a", Priority::Low, 2);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("a"), Some(&1));
        assert_eq!(queue.priority_of("a"), Some(Priority::Normal));
    }

    #[test]
    fn test_upgrade_moves_to_back_of_better_band() {
        let mut queue = PrefetchQueue::new();
        queue.push("a", Priority::Low, ());
        queue.push("b", Priority::High, ());
        queue.push("c", Priority::Low, ());

        assert!(queue.upgrade("c", Priority::High));
        assert!(!queue.upgrade("c", Priority::Normal));
        assert!(!queue.upgrade("missing", Priority::High));

        assert_eq!(queue.len(), 3);
        assert_eq!(popped_urls(&mut queue), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_drain_returns_payloads() {
        let mut queue = PrefetchQueue::new();
        queue.push("a", Priority::Low, 1);
        queue.push("b", Priority::High, 2);

        let mut drained = queue.drain();
        drained.sort_unstable();

        assert_eq!(drained, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert!(queue.pop().is_none());
    }
}
