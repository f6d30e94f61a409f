use std::fmt;

use reqwest::{redirect, Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::index::StoryId;
use crate::story::StoryRecord;

/// Which story listing the index is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryFeed {
    #[default]
    New,
    Top,
    Best,
    Ask,
    Show,
    Job,
}

impl StoryFeed {
    pub fn endpoint(self) -> &'static str {
        match self {
            StoryFeed::New => "newstories.json",
            StoryFeed::Top => "topstories.json",
            StoryFeed::Best => "beststories.json",
            StoryFeed::Ask => "askstories.json",
            StoryFeed::Show => "showstories.json",
            StoryFeed::Job => "jobstories.json",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "new" | "newest" => Some(StoryFeed::New),
            "top" => Some(StoryFeed::Top),
            "best" => Some(StoryFeed::Best),
            "ask" => Some(StoryFeed::Ask),
            "show" => Some(StoryFeed::Show),
            "job" | "jobs" => Some(StoryFeed::Job),
            _ => None,
        }
    }
}

impl fmt::Display for StoryFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoryFeed::New => "new",
            StoryFeed::Top => "top",
            StoryFeed::Best => "best",
            StoryFeed::Ask => "ask",
            StoryFeed::Show => "show",
            StoryFeed::Job => "job",
        };
        f.write_str(name)
    }
}

/// Builds the shared HTTP client from the api section of the config.
pub fn build_http_client(config: &ApiConfig) -> Result<Client, FetchError> {
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Thin client for the Hacker News Firebase API. Every call is a single GET;
/// nothing is retried.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: Client,
    base: Url,
    feed: StoryFeed,
}

impl HnClient {
    pub fn new(http: Client, base_url: &str, feed: StoryFeed) -> Result<Self, FetchError> {
        // `Url::join` drops the last path segment unless the base ends in '/'.
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self { http, base, feed })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, FetchError> {
        let http = build_http_client(config)?;
        Self::new(http, &config.base_url, config.feed)
    }

    pub fn feed(&self) -> StoryFeed {
        self.feed
    }

    pub fn index_url(&self) -> Result<Url, FetchError> {
        Ok(self.base.join(self.feed.endpoint())?)
    }

    pub fn item_url(&self, id: StoryId) -> Result<Url, FetchError> {
        Ok(self.base.join(&format!("item/{id}.json"))?)
    }

    /// Newest-first list of story ids.
    pub async fn fetch_index(&self) -> Result<Vec<StoryId>, FetchError> {
        let url = self.index_url()?;
        let bytes = self.get_bytes(url).await?;
        let ids: Vec<StoryId> = serde_json::from_slice(&bytes)?;
        debug!(feed = %self.feed, count = ids.len(), "fetched story index");
        Ok(ids)
    }

    pub async fn fetch_item(&self, id: StoryId) -> Result<StoryRecord, FetchError> {
        let url = self.item_url(id)?;
        let bytes = self.get_bytes(url).await?;
        // Unknown ids come back as a literal `null`.
        let fields: Option<Map<String, Value>> = serde_json::from_slice(&bytes)?;
        let fields = fields.ok_or(FetchError::Missing(id))?;
        Ok(StoryRecord::from_fields(fields))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
