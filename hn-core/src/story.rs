use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::index::StoryId;

/// A Hacker News item exactly as the API returned it. Only the title may be
/// replaced (by a translation); every other field is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryRecord {
    fields: Map<String, Value>,
}

impl StoryRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> Option<StoryId> {
        self.fields.get("id").and_then(Value::as_u64)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_field("by")
    }

    pub fn url(&self) -> Option<&str> {
        self.str_field("url")
    }

    pub fn kind(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn score(&self) -> Option<i64> {
        self.fields.get("score").and_then(Value::as_i64)
    }

    pub fn comment_count(&self) -> Option<i64> {
        self.fields.get("descendants").and_then(Value::as_i64)
    }

    /// `time` is whole UNIX seconds from the API; a float is tolerated and
    /// truncated. Out-of-range values give `None`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let time = self.fields.get("time")?;
        let secs = time
            .as_i64()
            .or_else(|| time.as_f64().map(|value| value as i64))?;
        DateTime::from_timestamp(secs, 0)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.fields
            .insert("title".to_owned(), Value::String(title.into()));
        self
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for StoryRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}
