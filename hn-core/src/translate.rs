use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::TranslationConfig;
use crate::error::TranslationError;

/// Anything that can turn a title from one language into another.
pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, TranslationError>>;
}

/// Talks to a LibreTranslate-compatible `/translate` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

impl HttpTranslator {
    pub fn new(http: Client, endpoint: &str, api_key: Option<String>) -> Result<Self, TranslationError> {
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            api_key,
        })
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError> {
        let body = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let reply: TranslateResponse = response.json().await?;
        match (reply.translated_text, reply.error) {
            (Some(text), None) if status.is_success() => Ok(text),
            (_, Some(error)) => Err(TranslationError::Rejected(error)),
            _ => Err(TranslationError::Rejected(format!("unexpected reply ({status})"))),
        }
    }
}

impl Translator for HttpTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, TranslationError>> {
        Box::pin(self.request(text, source, target))
    }
}

/// A translator pinned to one language pair for the lifetime of a coordinator.
#[derive(Clone)]
pub struct TranslationSession {
    source: String,
    target: String,
    translator: Arc<dyn Translator>,
}

impl fmt::Debug for TranslationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationSession")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl TranslationSession {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            translator,
        }
    }

    /// Builds a session for the configured (or locale-derived) target
    /// language. Returns `None` when the target is the source language.
    pub fn from_config(
        config: &TranslationConfig,
        http: Client,
        locale: Option<&str>,
    ) -> Result<Option<Self>, TranslationError> {
        let source = locale_language(&config.source_language);
        let target = config
            .target_language
            .as_deref()
            .or(locale)
            .map(locale_language);
        let Some(target) = target else {
            debug!("no target language, titles stay untranslated");
            return Ok(None);
        };
        if target.is_empty() || target == source {
            debug!(language = %source, "locale matches source language, titles stay untranslated");
            return Ok(None);
        }
        let translator = HttpTranslator::new(http, &config.endpoint, config.api_key.clone())?;
        info!(%source, %target, "title translation enabled");
        Ok(Some(Self::new(source, target, Arc::new(translator))))
    }

    pub fn source_language(&self) -> &str {
        &self.source
    }

    pub fn target_language(&self) -> &str {
        &self.target
    }

    pub async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        self.translator
            .translate(text, &self.source, &self.target)
            .await
    }
}

/// `fr_FR.UTF-8`, `fr-FR` and `FR` all become `fr`. `C`/`POSIX` map to `en`.
pub fn locale_language(tag: &str) -> String {
    let language = tag
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match language.as_str() {
        "c" | "posix" => "en".to_owned(),
        _ => language,
    }
}
