//! Machine translation collaborator and its circuit breaker.
//!
//! Translation is best effort: once a request fails the shared breaker latches
//! to `Unavailable` and every later call hands back its input unchanged, so a
//! dead translation service never blocks a locale write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::error::{Result, SectionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Available,
    Unavailable,
}

/// Latched availability flag shared by every user of one translation service.
#[derive(Debug)]
pub struct CircuitBreaker {
    available: AtomicBool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self { available: AtomicBool::new(true) }
    }
}

impl CircuitBreaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> BreakerState {
        if self.available.load(Ordering::Acquire) {
            BreakerState::Available
        } else {
            BreakerState::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        self.state() == BreakerState::Available
    }

    pub fn trip(&self) {
        if self.available.swap(false, Ordering::AcqRel) {
            warn!("translation service unreachable, falling back to untranslated text");
        }
    }

    pub fn reset(&self) {
        self.available.store(true, Ordering::Release);
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_locale`.
    ///
    /// Fails only with `UnsupportedLocale`; transport problems degrade to
    /// returning `text` unchanged.
    async fn translate(&self, text: &str, target_locale: &str) -> Result<String>;

    async fn is_available(&self) -> bool;
}

/// Hands every string back as-is. Used for offline runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _target_locale: &str) -> Result<String> {
        Ok(text.to_string())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// LibreTranslate-compatible HTTP client.
pub struct LibreTranslateClient {
    base_url: String,
    api_key: String,
    source_locale: String,
    supported: Vec<String>,
    client: Client,
    breaker: Arc<CircuitBreaker>,
}

impl LibreTranslateClient {
    pub fn new(config: &ToolConfig, breaker: Arc<CircuitBreaker>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SectionError::Config(format!("translation client: {e}")))?;
        let mut base_url = config.translation_service_url.clone();
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        Ok(Self {
            base_url,
            api_key: config.translation_service_api_key.clone(),
            source_locale: config.default_language.clone(),
            supported: config.supported_languages.clone(),
            client,
            breaker,
        })
    }

    async fn request(&self, text: &str, target_locale: &str) -> std::result::Result<String, reqwest::Error> {
        let body = json!({
            "q": text,
            "source": self.source_locale,
            "target": target_locale,
            "format": "text",
            "alternatives": 0,
            "api_key": self.api_key,
        });
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let data: TranslateResponse = response.json().await?;
        Ok(data.translated_text)
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, target_locale: &str) -> Result<String> {
        if !self.supported.iter().any(|l| l == target_locale) {
            return Err(SectionError::UnsupportedLocale(target_locale.to_string()));
        }
        if !self.breaker.is_available() || text.is_empty() {
            return Ok(text.to_string());
        }
        match self.request(text, target_locale).await {
            Ok(translated) => {
                self.breaker.reset();
                debug!(target = target_locale, "translated text");
                Ok(translated)
            }
            Err(e) => {
                debug!(error = %e, "translation request failed");
                self.breaker.trip();
                Ok(text.to_string())
            }
        }
    }

    /// Probe the service; a successful probe closes a tripped breaker again.
    async fn is_available(&self) -> bool {
        match self.request("", &self.source_locale).await {
            Ok(_) => {
                self.breaker.reset();
                true
            }
            Err(e) => {
                debug!(error = %e, "translation probe failed");
                self.breaker.trip();
                false
            }
        }
    }
}
