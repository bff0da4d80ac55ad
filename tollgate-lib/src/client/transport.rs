//! The `reqwest` transport and the classification of HTTP responses into
//! [`Outcome`]s.

use std::sync::{Arc, LazyLock};

use http::{Method, StatusCode};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::{ApiResponse, ErrorKind, Outcome, RequestFn};

/// Matches the body of a "no content for language" rejection
static LANGUAGE_UNAVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)no content (?:available )?for language\s*['"]?([a-z]{2,3}(?:[-_][a-z0-9]+)*)"#)
        .unwrap()
});

/// Sends requests with a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    reqwest_client: reqwest::Client,
}

impl Transport {
    pub(crate) const fn new(reqwest_client: reqwest::Client) -> Self {
        Self { reqwest_client }
    }

    /// A request function which sends `method url` with an optional JSON
    /// `body` every time it is called
    pub(crate) fn request_fn(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> RequestFn<ApiResponse> {
        let client = self.reqwest_client.clone();
        RequestFn::new(move || {
            let client = client.clone();
            let method = method.clone();
            let url = url.clone();
            let body = body.clone();
            async move { send(&client, method, url, body.as_ref()).await }
        })
    }
}

async fn send(
    client: &reqwest::Client,
    method: Method,
    url: Url,
    body: Option<&Value>,
) -> Outcome<ApiResponse> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Outcome::Failed(ErrorKind::NetworkRequest(Arc::new(e))),
    };
    match ApiResponse::from_response(response).await {
        Ok(response) => classify(response),
        Err(e) => Outcome::Failed(e),
    }
}

/// Map a complete response to the outcome the coordinator acts on
pub(crate) fn classify(response: ApiResponse) -> Outcome<ApiResponse> {
    let status = response.status;
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Outcome::RateLimited;
    }
    if status.is_success() {
        return Outcome::Ok(response);
    }
    if let Some(language) = unavailable_language(&response.text) {
        return Outcome::Failed(ErrorKind::LanguageUnavailable { language });
    }
    Outcome::Failed(ErrorKind::RejectedStatusCode {
        status,
        body: response.text.to_string(),
    })
}

/// Extract the language code from a "no content for language" message
fn unavailable_language(body: &str) -> Option<String> {
    LANGUAGE_UNAVAILABLE
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_lowercase())
}
