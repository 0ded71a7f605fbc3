//! Text translation
//!
//! [`HttpTranslator`] talks to a remote translation service and degrades to
//! echoing its input on failure. [`translate_batch`] fans independent
//! requests out concurrently.

mod http;

use futures::future;
use serde::{Deserialize, Serialize};

use crate::capability::{TranslationResult, Translator};

pub use http::{DEFAULT_TIMEOUT, HttpTranslator, TRANSLATED_CONFIDENCE, TranslateProvider};

/// One independent item of a batch translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub from: String,
    pub to: String,
}

impl TranslationRequest {
    #[must_use]
    pub fn new(text: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Translate every request concurrently
///
/// Results come back in request order regardless of completion order.
pub async fn translate_batch<T>(translator: &T, requests: &[TranslationRequest]) -> Vec<TranslationResult>
where
    T: Translator + ?Sized,
{
    tracing::debug!(count = requests.len(), "dispatching batch translation");

    future::join_all(
        requests
            .iter()
            .map(|req| translator.translate(&req.text, &req.from, &req.to)),
    )
    .await
}

/// Canonical comparison form of a locale tag (`pt_BR` → `pt-br`)
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Whether two locale tags name exactly the same language variant
#[must_use]
pub fn same_language(a: &str, b: &str) -> bool {
    normalize_tag(a) == normalize_tag(b)
}

/// Primary language subtag of a locale tag (`en-US` → `en`)
#[must_use]
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
