//! Load coordination: who fetches which story, and who gets told about it.
//!
//! Rows are resolved to story ids under the state lock, so a refresh that
//! prepends stories between two calls never makes a load land on the wrong
//! row. The lock is never held across a request.

use std::future::Future;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::HnClient;
use crate::cache::{ContentCache, ContentEntry};
use crate::config::LoadConfig;
use crate::error::FetchError;
use crate::index::{IndexStore, StoryId};
use crate::story::StoryRecord;
use crate::translate::TranslationSession;
use crate::view::{RowView, StoryDetail};

/// What happens to a story whose fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The entry stays `Loading` and is never fetched again.
    #[default]
    StuckLoading,
    /// The entry becomes `Failed` and the next display or prefetch refetches it.
    RetryOnDisplay,
}

/// Notifications for the presentation layer, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Index or cache contents changed; re-render visible rows.
    DataChanged,
    /// One `load_index` cycle finished, successfully or not.
    RefreshComplete,
    /// User-facing failure message.
    Error(String),
}

/// Outcome of a single [`Coordinator::load_row`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLoad {
    /// The index does not reach this row yet.
    OutOfRange,
    /// Another caller is fetching, or already fetched, this story.
    AlreadyRequested,
    Committed(StoryId),
}

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub translation: Option<TranslationSession>,
    pub failure_policy: FailurePolicy,
    pub max_concurrent_fetches: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            translation: None,
            failure_policy: FailurePolicy::default(),
            max_concurrent_fetches: 8,
        }
    }
}

impl CoordinatorOptions {
    pub fn from_config(loading: &LoadConfig, translation: Option<TranslationSession>) -> Self {
        Self {
            translation,
            failure_policy: loading.failure_policy,
            max_concurrent_fetches: loading.max_concurrent_fetches,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    index: IndexStore,
    cache: ContentCache,
}

#[derive(Debug)]
struct Shared {
    client: HnClient,
    options: CoordinatorOptions,
    state: Mutex<State>,
    events: mpsc::UnboundedSender<Event>,
    shutdown: watch::Sender<bool>,
}

/// Owns the story index and content cache for one list session and makes
/// sure each story is fetched at most once.
///
/// Cloning is cheap; clones share the same state. The state mutex is only
/// held for in-memory reads and writes, never across a request.
#[derive(Debug, Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    pub fn new(
        client: HnClient,
        options: CoordinatorOptions,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                client,
                options,
                state: Mutex::new(State::default()),
                events,
                shutdown,
            }),
        }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.shared.options
    }

    /// Fetches the index and merges it. Always ends with `RefreshComplete`.
    pub async fn load_index(&self) -> Result<usize, FetchError> {
        let outcome = match self.shared.client.fetch_index().await {
            Ok(ids) => {
                let (added, total) = {
                    let mut state = self.state();
                    let added = state.index.merge(&ids);
                    (added, state.index.len())
                };
                info!(added, total, "story index merged");
                self.notify(Event::DataChanged);
                Ok(added)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch story index");
                self.notify(Event::Error(format!("Could not load stories: {err}")));
                Err(err)
            }
        };
        self.notify(Event::RefreshComplete);
        outcome
    }

    /// Spawned `load_index`, for pull-to-refresh style triggers.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn refresh(&self) -> JoinHandle<()> {
        let this = self.clone();
        self.spawn(async move {
            if let Ok(added) = this.load_index().await {
                debug!(added, "refresh finished");
            }
        })
    }

    /// Loads one row unless it is out of range or already claimed.
    pub async fn load_row(&self, row: usize) -> Result<RowLoad, FetchError> {
        let id = {
            let mut state = self.state();
            let Some(id) = state.index.get(row) else {
                return Ok(RowLoad::OutOfRange);
            };
            if !state.cache.mark_loading(id) {
                return Ok(RowLoad::AlreadyRequested);
            }
            id
        };

        debug!(row, id, "fetching story");
        let record = match self.shared.client.fetch_item(id).await {
            Ok(record) => record,
            Err(err) => {
                self.fail(id, &err);
                return Err(err);
            }
        };
        let record = self.translate_title(id, record).await;

        self.state().cache.commit(id, record);
        debug!(row, id, "story ready");
        self.notify(Event::DataChanged);
        Ok(RowLoad::Committed(id))
    }

    /// Called when a row is about to be displayed. Spawns a load only when
    /// the row is in range and still needs one.
    ///
    /// # Panics
    ///
    /// Panics when a load is needed and no Tokio runtime is running.
    pub fn ensure_loaded(&self, row: usize) -> Option<JoinHandle<()>> {
        if !self.needs_load(row) {
            return None;
        }
        let this = self.clone();
        Some(self.spawn(async move { this.load_quietly(row).await }))
    }

    /// Warms the cache for rows that are likely to be displayed soon.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn prefetch(&self, rows: impl IntoIterator<Item = usize>) -> JoinHandle<()> {
        let rows: Vec<usize> = rows.into_iter().collect();
        let limit = self.shared.options.max_concurrent_fetches.max(1);
        let this = self.clone();
        self.spawn(async move {
            debug!(count = rows.len(), "prefetching rows");
            let this = &this;
            stream::iter(rows)
                .for_each_concurrent(limit, move |row| this.load_quietly(row))
                .await;
        })
    }

    /// Cancels every spawned load and refresh. Later spawns exit immediately.
    pub fn shutdown(&self) {
        info!("coordinator shutting down");
        self.shared.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    // Snapshots. Each takes the lock once and copies out.

    pub fn row_count(&self) -> usize {
        self.state().index.len()
    }

    pub fn story_id(&self, row: usize) -> Option<StoryId> {
        self.state().index.get(row)
    }

    pub fn ids(&self) -> Vec<StoryId> {
        self.state().index.ids().to_vec()
    }

    /// Cache state of a row; `Absent` past the end of the index.
    pub fn entry(&self, row: usize) -> ContentEntry {
        let state = self.state();
        state
            .index
            .get(row)
            .map(|id| state.cache.get(id))
            .unwrap_or_default()
    }

    pub fn row(&self, row: usize) -> Option<RowView> {
        let state = self.state();
        let id = state.index.get(row)?;
        Some(RowView::new(row, id, state.cache.peek(id)))
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.rows_in(0..usize::MAX)
    }

    pub fn rows_in(&self, range: Range<usize>) -> Vec<RowView> {
        let state = self.state();
        let end = range.end.min(state.index.len());
        let start = range.start.min(end);
        state.index.ids()[start..end]
            .iter()
            .enumerate()
            .map(|(offset, id)| RowView::new(start + offset, *id, state.cache.peek(*id)))
            .collect()
    }

    /// Detail hand-off for a selected row: the committed record at the time
    /// of selection, or nothing if the row is not ready.
    pub fn select(&self, row: usize) -> Option<StoryDetail> {
        let state = self.state();
        let id = state.index.get(row)?;
        let record = state.cache.peek(id)?.record()?;
        Some(StoryDetail::new(id, record))
    }

    fn needs_load(&self, row: usize) -> bool {
        let state = self.state();
        state
            .index
            .get(row)
            .is_some_and(|id| state.cache.is_loadable(id))
    }

    async fn load_quietly(&self, row: usize) {
        // Failures were already reported on the event channel.
        if let Ok(outcome) = self.load_row(row).await {
            debug!(row, ?outcome, "row load finished");
        }
    }

    async fn translate_title(&self, id: StoryId, record: StoryRecord) -> StoryRecord {
        let Some(session) = &self.shared.options.translation else {
            return record;
        };
        let Some(title) = record.title() else {
            return record;
        };
        let translated = session.translate(title).await;
        match translated {
            Ok(title) => record.with_title(title),
            Err(err) => {
                warn!(id, error = %err, "title translation failed, keeping original");
                self.notify(Event::Error(format!("Could not translate story {id}: {err}")));
                record
            }
        }
    }

    fn fail(&self, id: StoryId, err: &FetchError) {
        warn!(id, error = %err, "failed to load story");
        if self.shared.options.failure_policy == FailurePolicy::RetryOnDisplay {
            self.state().cache.mark_failed(id, err.to_string());
        }
        self.notify(Event::Error(format!("Could not load story {id}: {err}")));
    }

    fn notify(&self, event: Event) {
        if self.shared.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    // Every background task goes through here so `shutdown` reaches it.
    fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shared.shutdown.subscribe();
        tokio::spawn(async move {
            let stopped = *shutdown.borrow_and_update();
            if stopped {
                debug!("coordinator is shut down, skipping task");
                return;
            }
            tokio::select! {
                _ = shutdown.changed() => debug!("task cancelled by shutdown"),
                () = task => {}
            }
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // State updates are single assignments, so a poisoned lock still
        // holds consistent data.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
