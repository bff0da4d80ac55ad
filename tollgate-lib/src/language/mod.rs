//! One-shot content language fallback.
//!
//! Some endpoints answer with a "no content for language X" error when the
//! requested translation does not exist. [`LanguageFallback`] catches that
//! specific error, picks the preferred available language and repeats the
//! call exactly once in that language. Any other error passes through.

mod cache;
mod config;

use std::future::Future;
use std::sync::Arc;

use log::{debug, info};

use crate::Result;
use crate::ratelimit::{Clock, TokioClock};

pub use cache::{LanguageCache, LanguageSource, StaticLanguages};
pub use config::{DEFAULT_LANGUAGE, LanguageConfig};

/// Wraps language-sensitive calls and retries them once in a fallback
/// language when their content is missing.
#[derive(Debug)]
pub struct LanguageFallback {
    cache: LanguageCache,
}

impl LanguageFallback {
    /// Create a fallback orchestrator looking up languages from `source`
    #[must_use]
    pub fn new(config: &LanguageConfig, source: Option<Arc<dyn LanguageSource>>) -> Self {
        Self::with_clock(config, source, Arc::new(TokioClock))
    }

    /// Like [`LanguageFallback::new`], with an explicit clock for the
    /// language cache
    #[must_use]
    pub fn with_clock(
        config: &LanguageConfig,
        source: Option<Arc<dyn LanguageSource>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: LanguageCache::new(
                source,
                config.cache_ttl,
                config.default_language.clone(),
                clock,
            ),
        }
    }

    /// The language a failed call would be retried in
    pub async fn fallback_language(&self) -> String {
        self.cache.fallback_language().await
    }

    /// Await `original`. If it failed because content in `requested` is
    /// missing, call `make` with the fallback language and return that
    /// result instead.
    ///
    /// There is no second fallback: if the retry fails, its error is
    /// returned. If the fallback language is the requested one, the
    /// original error is returned without a retry.
    ///
    /// # Errors
    ///
    /// Returns the error of `original` unless it is
    /// [`ErrorKind::LanguageUnavailable`](crate::ErrorKind::LanguageUnavailable),
    /// otherwise the error of the retry.
    pub async fn wrap<R, O, M, F>(&self, original: O, requested: &str, make: M) -> Result<R>
    where
        O: Future<Output = Result<R>>,
        M: FnOnce(String) -> F,
        F: Future<Output = Result<R>>,
    {
        let error = match original.await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let Some(missing) = error.unavailable_language() else {
            return Err(error);
        };

        let fallback = self.fallback_language().await;
        if fallback == requested {
            debug!("No content for '{missing}' and no other language to fall back to");
            return Err(error);
        }

        info!("No content for '{missing}', retrying in '{fallback}'");
        make(fallback).await
    }

    /// Await `original`, substituting an empty result if its content is
    /// missing in the requested language.
    ///
    /// This is the form of [`LanguageFallback::wrap`] for callers that have
    /// no request to repeat in another language.
    /// [`Client::get_localized_or_none`](crate::Client::get_localized_or_none)
    /// uses it with `Option` as the empty result.
    ///
    /// # Errors
    ///
    /// Returns the error of `original` unless it is
    /// [`ErrorKind::LanguageUnavailable`](crate::ErrorKind::LanguageUnavailable).
    pub async fn wrap_or_default<R, O>(&self, original: O) -> Result<R>
    where
        R: Default,
        O: Future<Output = Result<R>>,
    {
        match original.await {
            Err(e) if e.unavailable_language().is_some() => {
                debug!("{e}, using an empty result");
                Ok(R::default())
            }
            result => result,
        }
    }
}
