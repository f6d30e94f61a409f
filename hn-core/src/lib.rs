pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod index;
pub mod story;
pub mod translate;
pub mod view;

pub use api::{build_http_client, HnClient, StoryFeed};
pub use cache::{ContentCache, ContentEntry};
pub use config::{ApiConfig, LoadConfig, ReaderConfig, TranslationConfig};
pub use coordinator::{Coordinator, CoordinatorOptions, Event, FailurePolicy, RowLoad};
pub use error::{ConfigError, FetchError, TranslationError};
pub use index::{IndexStore, StoryId};
pub use story::StoryRecord;
pub use translate::{locale_language, HttpTranslator, TranslationSession, Translator};
pub use view::{RowStatus, RowView, StoryDetail};
