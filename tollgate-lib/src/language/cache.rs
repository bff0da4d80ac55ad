use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::Instant;

use crate::Result;
use crate::ratelimit::Clock;

/// Where the list of available content languages comes from
#[async_trait]
pub trait LanguageSource: Send + Sync + Debug {
    /// Fetch the language codes the API has content for, preferred first
    async fn languages(&self) -> Result<Vec<String>>;
}

/// A fixed list of languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLanguages(pub Vec<String>);

#[async_trait]
impl LanguageSource for StaticLanguages {
    async fn languages(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
struct CachedLanguages {
    languages: Vec<String>,
    expires_at: Instant,
}

/// Lazily refreshed list of available languages.
///
/// Successful lookups are kept for the configured TTL. Failed or empty
/// lookups are not cached and resolve to the default language alone.
#[derive(Debug)]
pub struct LanguageCache {
    source: Option<Arc<dyn LanguageSource>>,
    ttl: Duration,
    default_language: String,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedLanguages>>,
}

impl LanguageCache {
    /// Create an empty cache. Without a `source`, the default language is
    /// the only language known.
    #[must_use]
    pub fn new(
        source: Option<Arc<dyn LanguageSource>>,
        ttl: Duration,
        default_language: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            ttl,
            default_language,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// The available languages, fetched from the source if the cached list
    /// is missing or expired
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex is poisoned
    pub async fn languages(&self) -> Vec<String> {
        if let Some(cached) = self.cached.lock().unwrap().as_ref()
            && self.clock.now() < cached.expires_at
        {
            return cached.languages.clone();
        }

        let Some(source) = &self.source else {
            return vec![self.default_language.clone()];
        };

        match source.languages().await {
            Ok(languages) if !languages.is_empty() => {
                debug!("Fetched available languages: {languages:?}");
                *self.cached.lock().unwrap() = Some(CachedLanguages {
                    languages: languages.clone(),
                    expires_at: self.clock.now() + self.ttl,
                });
                languages
            }
            Ok(_) => {
                warn!(
                    "Language lookup returned no languages, using '{}'",
                    self.default_language
                );
                vec![self.default_language.clone()]
            }
            Err(e) => {
                warn!(
                    "Language lookup failed, using '{}': {e}",
                    self.default_language
                );
                vec![self.default_language.clone()]
            }
        }
    }

    /// The preferred fallback language: the first available language
    pub async fn fallback_language(&self) -> String {
        self.languages()
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| self.default_language.clone())
    }
}
