use std::collections::HashMap;

use tracing::debug;

use crate::index::StoryId;
use crate::story::StoryRecord;

/// Per-story lifecycle of the content cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContentEntry {
    #[default]
    Absent,
    Loading,
    Ready(StoryRecord),
    /// Only written under [`FailurePolicy::RetryOnDisplay`](crate::FailurePolicy).
    Failed(String),
}

impl ContentEntry {
    pub fn is_ready(&self) -> bool {
        matches!(self, ContentEntry::Ready(_))
    }

    pub fn record(&self) -> Option<&StoryRecord> {
        match self {
            ContentEntry::Ready(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_loadable(&self) -> bool {
        matches!(self, ContentEntry::Absent | ContentEntry::Failed(_))
    }
}

/// Story contents keyed by id. Not synchronised on its own: the coordinator
/// keeps it behind the same mutex as the index.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    entries: HashMap<StoryId, ContentEntry>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: StoryId) -> ContentEntry {
        self.entries.get(&id).cloned().unwrap_or_default()
    }

    pub fn peek(&self, id: StoryId) -> Option<&ContentEntry> {
        self.entries.get(&id)
    }

    pub fn is_loadable(&self, id: StoryId) -> bool {
        self.entries
            .get(&id)
            .map_or(true, ContentEntry::is_loadable)
    }

    /// Claims the story for fetching. Returns `false` when another caller
    /// already holds it (or it is ready), in which case nothing changes.
    pub fn mark_loading(&mut self, id: StoryId) -> bool {
        let entry = self.entries.entry(id).or_default();
        if entry.is_loadable() {
            *entry = ContentEntry::Loading;
            true
        } else {
            debug!(id, "story already requested");
            false
        }
    }

    /// Stores a fetched record, replacing whatever was there. The last commit wins.
    pub fn commit(&mut self, id: StoryId, record: StoryRecord) {
        if let Some(ContentEntry::Ready(_)) = self.entries.get(&id) {
            debug!(id, "overwriting ready story");
        }
        self.entries.insert(id, ContentEntry::Ready(record));
    }

    /// `Loading -> Failed`. Ready entries are left untouched.
    pub fn mark_failed(&mut self, id: StoryId, reason: impl Into<String>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if matches!(entry, ContentEntry::Loading) => {
                *entry = ContentEntry::Failed(reason.into());
                true
            }
            _ => false,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_ready()).count()
    }

    pub fn loading_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry, ContentEntry::Loading))
            .count()
    }
}
