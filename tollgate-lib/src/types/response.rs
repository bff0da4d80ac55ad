use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{ErrorKind, Result};

/// The result of a HTTP request, as delivered to every caller that joined it.
///
/// This abstraction exists, because [`Response`] cannot be shared between
/// several awaiters since it does not implement [`Clone`] and its body can
/// only be consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status code of the response
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// The final URL after redirects
    pub url: Url,
    /// The response body
    pub text: Arc<str>,
}

impl ApiResponse {
    /// Read a [`Response`] to the end and keep everything needed later on
    pub(crate) async fn from_response(response: Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let text = response
            .text()
            .await
            .map_err(|e| ErrorKind::ReadResponseBody(Arc::new(e)))?;

        Ok(Self {
            status,
            headers,
            url,
            text: text.into(),
        })
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidJson`] if the body is not a valid
    /// representation of `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.text).map_err(|e| ErrorKind::InvalidJson(Arc::new(e)))
    }
}
