use std::io::{self, Write};
use std::time::Duration;

use hn_core::{
    build_http_client, Coordinator, CoordinatorOptions, Event, FetchError, HnClient, ReaderConfig,
    RowStatus, TranslationError, TranslationSession,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::args::Args;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

pub async fn run(config: ReaderConfig, args: &Args) -> Result<(), AppError> {
    let http = build_http_client(&config.api)?;
    let client = HnClient::new(http.clone(), &config.api.base_url, config.api.feed)?;
    let translation = match &config.translation {
        Some(translation) => {
            TranslationSession::from_config(translation, http, system_locale().as_deref())?
        }
        None => None,
    };
    let options = CoordinatorOptions::from_config(&config.loading, translation);

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(client, options, update_tx);
    let mut list = StoryList::new(
        coordinator.clone(),
        update_rx,
        config.loading.visible_rows,
        config.loading.prefetch_window,
        args.open,
    );

    info!(feed = %config.api.feed, "loading stories");
    coordinator.refresh();
    list.run(args.wait()).await;
    list.render(&mut io::stdout().lock())?;

    let opened = match args.open {
        Some(row) => open_detail(&coordinator, row),
        None => Ok(()),
    };
    coordinator.shutdown();
    opened
}

/// Terminal stand-in for a scrolling table: the first `visible` rows are
/// "on screen", the next `prefetch_window` rows are about to be. A row picked
/// with `--open` counts as on screen too, wherever it sits.
struct StoryList {
    coordinator: Coordinator,
    updates: mpsc::UnboundedReceiver<Event>,
    visible: usize,
    prefetch_window: usize,
    selected: Option<usize>,
    refreshed: bool,
}

impl StoryList {
    fn new(
        coordinator: Coordinator,
        updates: mpsc::UnboundedReceiver<Event>,
        visible: usize,
        prefetch_window: usize,
        selected: Option<usize>,
    ) -> Self {
        Self {
            coordinator,
            updates,
            visible,
            prefetch_window,
            selected,
            refreshed: false,
        }
    }

    /// Pumps events until every visible row is settled or `wait` runs out.
    async fn run(&mut self, wait: Duration) {
        let deadline = Instant::now() + wait;
        loop {
            let event = match tokio::time::timeout_at(deadline, self.updates.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    warn!("stopped waiting for stories to load");
                    break;
                }
            };
            self.handle(event);
            if self.refreshed && self.is_settled() {
                break;
            }
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::RefreshComplete => {
                self.refreshed = true;
                self.display_visible();
                let start = self.visible;
                self.coordinator
                    .prefetch(start..start.saturating_add(self.prefetch_window));
            }
            Event::DataChanged => self.display_visible(),
            Event::Error(message) => eprintln!("alert: {message}"),
        }
    }

    /// Equivalent of a table reload: every visible row asks to be loaded.
    fn display_visible(&self) {
        let shown = self.visible.min(self.coordinator.row_count());
        let requested = (0..shown)
            .chain(self.selected)
            .filter_map(|row| self.coordinator.ensure_loaded(row))
            .count();
        if requested > 0 {
            debug!(requested, "requested visible rows");
        }
    }

    fn is_settled(&self) -> bool {
        // A selected row past the end of the index has nothing to wait for.
        let selected_settled = self
            .selected
            .and_then(|row| self.coordinator.row(row))
            .map_or(true, |row| row.is_settled());
        selected_settled
            && self
                .coordinator
                .rows_in(0..self.visible)
                .iter()
                .all(|row| row.is_settled())
    }

    fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let rows = self.coordinator.rows_in(0..self.visible);
        for row in &rows {
            writeln!(out, "{:>3}. {}", row.row, row.title)?;
            match (&row.byline, row.status) {
                (Some(byline), _) => writeln!(out, "     {byline}")?,
                (None, RowStatus::Loading) => writeln!(out, "     loading...")?,
                (None, RowStatus::Failed) => writeln!(out, "     failed to load")?,
                (None, _) => {}
            }
        }
        let ready = rows.iter().filter(|row| row.status == RowStatus::Ready).count();
        writeln!(
            out,
            "\n{ready} of {} shown stories loaded, {} in the index",
            rows.len(),
            self.coordinator.row_count()
        )?;
        out.flush()
    }
}

fn open_detail(coordinator: &Coordinator, row: usize) -> Result<(), AppError> {
    let Some(detail) = coordinator.select(row) else {
        warn!(row, "story is not loaded, nothing to open");
        return Ok(());
    };
    let url = detail.url.clone().unwrap_or_else(|| detail.discussion_url());
    info!(row, title = %detail.title, %url, "opening story");
    webbrowser::open(&url)?;
    Ok(())
}

fn system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_core::{ApiConfig, ContentEntry, FailurePolicy, StoryFeed};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn story_json(id: u64) -> String {
        format!(
            r#"{{"id":{id},"type":"story","title":"Story {id}","by":"alice","time":1713500000,"url":"https://example.com/{id}"}}"#
        )
    }

    async fn mount_index(server: &MockServer, ids: impl IntoIterator<Item = u64>) {
        let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        Mock::given(method("GET"))
            .and(path("/v0/newstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("[{}]", ids.join(","))))
            .mount(server)
            .await;
    }

    async fn mount_story(server: &MockServer, id: u64, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v0/item/{id}.json")))
            .respond_with(ResponseTemplate::new(200).set_body_string(story_json(id)))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_status(server: &MockServer, id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/v0/item/{id}.json")))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    fn story_list(
        server: &MockServer,
        options: CoordinatorOptions,
        visible: usize,
        prefetch_window: usize,
        selected: Option<usize>,
    ) -> StoryList {
        let http = build_http_client(&ApiConfig::default()).unwrap();
        let client = HnClient::new(http, &format!("{}/v0/", server.uri()), StoryFeed::New).unwrap();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        StoryList::new(
            Coordinator::new(client, options, update_tx),
            update_rx,
            visible,
            prefetch_window,
            selected,
        )
    }

    async fn wait_until_ready(coordinator: &Coordinator, rows: &[usize]) {
        for _ in 0..200 {
            if rows.iter().all(|row| coordinator.entry(*row).is_ready()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("rows {rows:?} never became ready");
    }

    #[tokio::test]
    async fn refresh_loads_visible_rows_then_prefetches_next_window() {
        let server = MockServer::start().await;
        mount_index(&server, 1..=6).await;
        for id in 1..=4 {
            mount_story(&server, id, 1).await;
        }
        for id in 5..=6 {
            mount_story(&server, id, 0).await;
        }

        let mut list = story_list(&server, CoordinatorOptions::default(), 2, 2, None);
        list.coordinator.refresh();
        let started = Instant::now();
        list.run(Duration::from_secs(30)).await;

        assert!(started.elapsed() < Duration::from_secs(10), "should stop once visible rows settle");
        assert!(list.coordinator.entry(0).is_ready());
        assert!(list.coordinator.entry(1).is_ready());

        wait_until_ready(&list.coordinator, &[2, 3]).await;
        assert_eq!(list.coordinator.entry(4), ContentEntry::Absent);
        assert_eq!(list.coordinator.entry(5), ContentEntry::Absent);
        server.verify().await;
    }

    #[tokio::test]
    async fn gives_up_at_deadline_when_rows_stay_loading() {
        let server = MockServer::start().await;
        mount_index(&server, [1]).await;
        mount_status(&server, 1, 500).await;

        let mut list = story_list(&server, CoordinatorOptions::default(), 1, 0, None);
        list.coordinator.refresh();
        let started = Instant::now();
        list.run(Duration::from_millis(300)).await;

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(list.coordinator.entry(0), ContentEntry::Loading);
        assert!(!list.is_settled());
    }

    #[tokio::test]
    async fn selected_row_outside_the_window_is_loaded() {
        let server = MockServer::start().await;
        mount_index(&server, 1..=30).await;
        mount_story(&server, 21, 1).await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v0/item/\d+\.json$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(story_json(0)))
            .mount(&server)
            .await;

        let mut list = story_list(&server, CoordinatorOptions::default(), 5, 2, Some(20));
        list.coordinator.refresh();
        list.run(Duration::from_secs(10)).await;

        let detail = list.coordinator.select(20).expect("selected row is loaded");
        assert_eq!(detail.id, 21);
        assert_eq!(detail.url.as_deref(), Some("https://example.com/21"));
        assert_eq!(list.coordinator.entry(25), ContentEntry::Absent);
        list.coordinator.shutdown();
    }

    #[tokio::test]
    async fn selected_row_past_the_index_does_not_hold_up_the_list() {
        let server = MockServer::start().await;
        mount_index(&server, [1]).await;
        mount_story(&server, 1, 1).await;

        let mut list = story_list(&server, CoordinatorOptions::default(), 1, 0, Some(99));
        list.coordinator.refresh();
        let started = Instant::now();
        list.run(Duration::from_secs(30)).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(list.coordinator.select(99).is_none());
    }

    #[tokio::test]
    async fn render_shows_each_row_state() {
        let server = MockServer::start().await;
        mount_index(&server, [1, 2, 3]).await;
        mount_story(&server, 1, 1).await;
        mount_status(&server, 2, 500).await;
        Mock::given(method("GET"))
            .and(path("/v0/item/3.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(story_json(3))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let options = CoordinatorOptions {
            failure_policy: FailurePolicy::RetryOnDisplay,
            ..CoordinatorOptions::default()
        };
        let list = story_list(&server, options, 3, 0, None);
        list.coordinator.load_index().await.unwrap();
        list.coordinator.load_row(0).await.unwrap();
        assert!(list.coordinator.load_row(1).await.is_err());
        let pending = list.coordinator.ensure_loaded(2).unwrap();
        for _ in 0..100 {
            if list.coordinator.entry(2) == ContentEntry::Loading {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut out = Vec::new();
        list.render(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "  0. Story 1\n     by alice on 2024-04-19 04:13 UTC\n  \
             1. 2\n     failed to load\n  \
             2. 3\n     loading...\n\
             \n1 of 3 shown stories loaded, 3 in the index\n"
        );

        list.coordinator.shutdown();
        pending.await.unwrap();
    }
}
