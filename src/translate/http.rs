//! Remote translation over HTTP

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::{normalize_tag, same_language};
use crate::capability::{TranslationResult, Translator};
use crate::credentials::CredentialProvider;
use crate::{Error, Result};

/// Confidence reported for a successful translation when the service gives none
pub const TRANSLATED_CONFIDENCE: f32 = 0.95;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const GOOGLE_BASE_URL: &str = "https://translation.googleapis.com";
const LIBRE_BASE_URL: &str = "https://libretranslate.com";

/// Response from Google Cloud Translation v2
#[derive(serde::Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(serde::Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

/// Response from LibreTranslate
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: String,
}

/// Translation service backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslateProvider {
    Google,
    LibreTranslate,
}

impl TranslateProvider {
    /// Default service URL for this provider
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Google => GOOGLE_BASE_URL,
            Self::LibreTranslate => LIBRE_BASE_URL,
        }
    }
}

impl TranslateProvider {
    /// Language code this service expects for a locale tag
    ///
    /// Most languages go by their primary subtag. Chinese keeps its script,
    /// and Google also distinguishes European Portuguese.
    #[must_use]
    pub fn language_code(self, tag: &str) -> String {
        let tag = normalize_tag(tag);
        let mut subtags = tag.split('-');
        let primary = subtags.next().unwrap_or_default();
        let variants: Vec<&str> = subtags.collect();

        match (self, primary) {
            (_, "zh") => {
                let traditional = variants
                    .iter()
                    .any(|v| matches!(*v, "hant" | "tw" | "hk" | "mo"));
                let code = match (self, traditional) {
                    (Self::Google, false) => "zh-CN",
                    (Self::Google, true) => "zh-TW",
                    (Self::LibreTranslate, false) => "zh-Hans",
                    (Self::LibreTranslate, true) => "zh-Hant",
                };
                code.to_string()
            }
            (Self::Google, "pt") if variants.contains(&"pt") => "pt-PT".to_string(),
            _ => primary.to_string(),
        }
    }
}

impl FromStr for TranslateProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "libre" | "libretranslate" => Ok(Self::LibreTranslate),
            other => Err(Error::Config(format!("unknown translation provider: {other}"))),
        }
    }
}

/// Translates text through a remote service
pub struct HttpTranslator {
    client: reqwest::Client,
    base_url: String,
    provider: TranslateProvider,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl HttpTranslator {
    /// Create a translator using Google Cloud Translation
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_google(credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::new(TranslateProvider::Google, Some(credentials), DEFAULT_TIMEOUT)
    }

    /// Create a translator using LibreTranslate; the API key is optional
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_libre(credentials: Option<Arc<dyn CredentialProvider>>) -> Result<Self> {
        Self::new(TranslateProvider::LibreTranslate, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a translator for `provider`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built. Google without
    /// credentials still builds; every request then degrades.
    pub fn new(
        provider: TranslateProvider,
        credentials: Option<Arc<dyn CredentialProvider>>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: provider.default_base_url().to_string(),
            provider,
            credentials,
        })
    }

    /// Point the translator at a different service URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The configured provider
    #[must_use]
    pub const fn provider(&self) -> TranslateProvider {
        self.provider
    }

    /// Translate, surfacing every failure
    ///
    /// # Errors
    ///
    /// Returns error on credential, network, HTTP status, or parse failure,
    /// when both tags map to the same service language, or when the service
    /// answers with empty text
    pub async fn try_translate(&self, text: &str, from: &str, to: &str) -> Result<TranslationResult> {
        let source = self.provider.language_code(from);
        let target = self.provider.language_code(to);
        if source == target {
            return Err(Error::Translation(format!(
                "{from} and {to} both map to '{source}' on this service"
            )));
        }

        let translated = match self.provider {
            TranslateProvider::Google => self.translate_google(text, &source, &target).await?,
            TranslateProvider::LibreTranslate => self.translate_libre(text, &source, &target).await?,
        };

        if translated.trim().is_empty() {
            return Err(Error::Translation("service returned empty text".to_string()));
        }

        Ok(TranslationResult::new(translated, TRANSLATED_CONFIDENCE))
    }

    /// Drop a credential the service refused so the next call resolves a fresh one
    async fn reject_credential(&self, status: reqwest::StatusCode) {
        let rejected = matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        );
        if rejected && let Some(credentials) = &self.credentials {
            tracing::debug!(status = %status, "credential rejected, invalidating");
            credentials.invalidate().await;
        }
    }

    /// Translate using Google Cloud Translation v2
    async fn translate_google(&self, text: &str, source: &str, target: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct GoogleRequest<'a> {
            q: &'a str,
            source: &'a str,
            target: &'a str,
            format: &'a str,
        }

        let Some(credentials) = &self.credentials else {
            return Err(Error::Credential("no translation credential configured".to_string()));
        };
        let key = credentials.credential().await?;

        tracing::debug!(chars = text.len(), source, target, "starting Google translation");

        let response = self
            .client
            .post(format!("{}/language/translate/v2", self.base_url))
            .query(&[("key", key.expose_secret())])
            .json(&GoogleRequest {
                q: text,
                source,
                target,
                format: "text",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google translation API error");
            self.reject_credential(status).await;
            return Err(Error::Translation(format!("Google API error {status}: {body}")));
        }

        let result: GoogleResponse = response.json().await?;
        let translated = result
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| unescape_html(&t.translated_text))
            .unwrap_or_default();

        Ok(translated)
    }

    /// Translate using LibreTranslate
    async fn translate_libre(&self, text: &str, source: &str, target: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct LibreRequest<'a> {
            q: &'a str,
            source: &'a str,
            target: &'a str,
            format: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            api_key: Option<&'a str>,
        }

        let key = match &self.credentials {
            Some(credentials) => Some(credentials.credential().await?),
            None => None,
        };

        tracing::debug!(chars = text.len(), source, target, "starting LibreTranslate translation");

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&LibreRequest {
                q: text,
                source,
                target,
                format: "text",
                api_key: key.as_ref().map(|k| k.expose_secret()),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "LibreTranslate API error");
            self.reject_credential(status).await;
            return Err(Error::Translation(format!("LibreTranslate error {status}: {body}")));
        }

        let result: LibreResponse = response.json().await?;
        Ok(result.translated_text)
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> TranslationResult {
        if same_language(from, to) {
            tracing::debug!(from, to, "same language, skipping remote call");
            return TranslationResult::new(text, 1.0);
        }

        match self.try_translate(text, from, to).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, from, to, "translation degraded");
                TranslationResult::degraded(text)
            }
        }
    }
}

/// Decode the handful of entities translation services emit
fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
