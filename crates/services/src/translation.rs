use std::env;

use async_trait::async_trait;
use progress_core::model::Language;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::TranslationError;

/// Translates free text from the source language into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    /// # Errors
    ///
    /// Returns `TranslationError` when the backend cannot be reached or
    /// answers with an error.
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError>;

    /// True when output always equals input, so results are not worth storing.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Returns text unchanged. Used when no translation backend is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _target: Language) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl TranslatorConfig {
    /// Reads `PROGRESS_TRANSLATE_URL` and `PROGRESS_TRANSLATE_API_KEY`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            env::var("PROGRESS_TRANSLATE_URL").ok(),
            env::var("PROGRESS_TRANSLATE_API_KEY").ok(),
        )
    }

    /// `None` when the URL is missing or blank; a blank key counts as no key.
    #[must_use]
    pub fn from_values(base_url: Option<String>, api_key: Option<String>) -> Option<Self> {
        let base_url = base_url?.trim().to_string();
        if base_url.is_empty() {
            return None;
        }
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Some(Self { base_url, api_key })
    }
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
#[derive(Clone)]
pub struct HttpTranslator {
    client: Client,
    config: TranslatorConfig,
}

impl HttpTranslator {
    #[must_use]
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let payload = TranslateRequest {
            q: text,
            source: Language::SOURCE.code(),
            target: target.code(),
            format: "text",
            api_key: self.config.api_key.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslationError::HttpStatus(response.status()));
        }

        let body: TranslateResponse = response.json().await?;
        body.translated_text
            .filter(|t| !t.is_empty() || text.is_empty())
            .ok_or(TranslationError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'static str,
    target: &'static str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}
