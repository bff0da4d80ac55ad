use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default time a fetched language list stays valid
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Language used when no language list is available
pub const DEFAULT_LANGUAGE: &str = "uk";

/// Configuration of the content language fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    /// Endpoint answering with `{ "languages": [...] }`.
    /// Without it, only the default language is known.
    #[serde(default)]
    pub languages_url: Option<Url>,

    /// How long a fetched language list is reused
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Fallback language when the language list cannot be fetched
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            languages_url: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            default_language: default_language(),
        }
    }
}

const fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
