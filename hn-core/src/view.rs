use crate::cache::ContentEntry;
use crate::index::StoryId;
use crate::story::StoryRecord;

pub const UNKNOWN_TITLE: &str = "(unknown)";
pub const DEFAULT_DETAIL_TITLE: &str = "Detail View";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Nothing requested yet.
    Placeholder,
    Loading,
    Ready,
    Failed,
}

/// What a list cell shows for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub row: usize,
    pub id: StoryId,
    /// The story title once ready, the bare id before that.
    pub title: String,
    pub byline: Option<String>,
    pub status: RowStatus,
}

impl RowView {
    pub fn new(row: usize, id: StoryId, entry: Option<&ContentEntry>) -> Self {
        let (title, byline, status) = match entry {
            Some(ContentEntry::Ready(record)) => (
                record.title().unwrap_or(UNKNOWN_TITLE).to_owned(),
                byline(record),
                RowStatus::Ready,
            ),
            Some(ContentEntry::Loading) => (id.to_string(), None, RowStatus::Loading),
            Some(ContentEntry::Failed(_)) => (id.to_string(), None, RowStatus::Failed),
            Some(ContentEntry::Absent) | None => (id.to_string(), None, RowStatus::Placeholder),
        };
        Self {
            row,
            id,
            title,
            byline,
            status,
        }
    }

    /// Ready or failed; nothing more will happen without another request.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, RowStatus::Ready | RowStatus::Failed)
    }
}

/// `by <author> on <date>`, either half optional.
pub fn byline(record: &StoryRecord) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(author) = record.author() {
        parts.push(format!("by {author}"));
    }
    if let Some(published) = record.published_at() {
        parts.push(format!("on {}", published.format("%Y-%m-%d %H:%M UTC")));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Everything the detail view needs for a selected story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDetail {
    pub id: StoryId,
    pub title: String,
    /// Absent for text posts (Ask HN and friends).
    pub url: Option<String>,
}

impl StoryDetail {
    pub fn new(id: StoryId, record: &StoryRecord) -> Self {
        Self {
            id,
            title: record.title().unwrap_or(DEFAULT_DETAIL_TITLE).to_owned(),
            url: record.url().map(ToOwned::to_owned),
        }
    }

    pub fn discussion_url(&self) -> String {
        format!("https://news.ycombinator.com/item?id={}", self.id)
    }
}
