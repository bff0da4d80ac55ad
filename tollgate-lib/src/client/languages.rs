use async_trait::async_trait;
use http::Method;
use serde::Deserialize;
use url::Url;

use super::transport::Transport;
use crate::{ApiResponse, Coordinator, LanguageSource, Result, Signature};

/// Response of the languages endpoint
#[derive(Debug, Deserialize)]
struct LanguageList {
    languages: Vec<String>,
}

/// Fetches available languages from an API endpoint.
///
/// Lookups go through the same [`Coordinator`] as every other request, so
/// concurrent lookups are merged and respect the cooldown.
#[derive(Debug)]
pub struct ApiLanguages {
    url: Url,
    transport: Transport,
    coordinator: Coordinator<ApiResponse>,
}

impl ApiLanguages {
    pub(crate) const fn new(
        url: Url,
        transport: Transport,
        coordinator: Coordinator<ApiResponse>,
    ) -> Self {
        Self {
            url,
            transport,
            coordinator,
        }
    }
}

#[async_trait]
impl LanguageSource for ApiLanguages {
    async fn languages(&self) -> Result<Vec<String>> {
        let request = self
            .transport
            .request_fn(Method::GET, self.url.clone(), None);
        let signature = Signature::of(&Method::GET, self.url.as_str());
        let response = self.coordinator.submit(request, signature).await?;
        Ok(response.json::<LanguageList>()?.languages)
    }
}
