//! HTTP client for a rate-limited API.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` sends requests through a shared [`Coordinator`] and wraps
//! localized requests in a [`LanguageFallback`]. `ClientBuilder` exposes a
//! finer level of granularity for building a `Client`.
#![allow(clippy::module_name_repetitions)]

mod languages;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderValue, Method, header};
use serde::Serialize;
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    ApiResponse, Coordinator, ErrorKind, LanguageConfig, LanguageFallback, LanguageSource,
    RateLimitConfig, Result, Signature, SignatureConfig,
};

pub use languages::ApiLanguages;
use transport::Transport;

/// Default timeout in seconds before a request is deemed as failed, 20.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Default user agent, `tollgate-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("tollgate/", env!("CARGO_PKG_VERSION"));

/// Placeholder for the language code in localized URL templates
pub const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Builder for [`Client`].
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Sets the default [headers] for every request.
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    custom_headers: HeaderMap,
    /// Response timeout per request.
    #[builder(default = Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))]
    timeout: Option<Duration>,
    /// Cooldown window and backoff schedule for rate-limited requests.
    rate_limit: RateLimitConfig,
    /// Where to look up available languages and how long to cache them.
    language: LanguageConfig,
    /// How request bodies are digested into signatures.
    signature: SignatureConfig,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// Must be called within a Tokio runtime, since the client spawns a
    /// task for every dispatched request.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent contains characters not allowed in a header.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let Self {
            user_agent,
            custom_headers: mut headers,
            timeout,
            rate_limit,
            language,
            signature,
        } = self;

        headers.insert(header::USER_AGENT, HeaderValue::from_str(&user_agent)?);

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers);

        let reqwest_client = (match timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
        .build()
        .map_err(|e| ErrorKind::BuildClient(Arc::new(e)))?;

        let transport = Transport::new(reqwest_client);
        let coordinator = Coordinator::new(rate_limit);
        let source = language.languages_url.clone().map(|url| {
            Arc::new(ApiLanguages::new(url, transport.clone(), coordinator.clone()))
                as Arc<dyn LanguageSource>
        });
        let fallback = LanguageFallback::new(&language, source);

        Ok(Client {
            transport,
            coordinator,
            fallback: Arc::new(fallback),
            signature,
        })
    }
}

/// Sends requests and returns their responses.
///
/// Identical requests in flight at the same time are sent only once,
/// rate-limited requests are retried with backoff, and new requests wait in
/// a queue while the API is cooling down. Cloning is cheap; clones share all
/// of that state.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
    coordinator: Coordinator<ApiResponse>,
    fallback: Arc<LanguageFallback>,
    signature: SignatureConfig,
}

impl Client {
    /// Send a request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - `url` cannot be parsed.
    /// - `body` cannot be serialized.
    /// - The request fails, see [`ErrorKind`].
    pub async fn request<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = Url::parse(url).map_err(|e| ErrorKind::InvalidUrl(url.to_string(), e))?;
        let signature = Signature::with_digest(url.as_str(), &method, body, self.signature.digest)?;
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ErrorKind::Serialization(Arc::new(e)))?;

        let request = self.transport.request_fn(method, url, body);
        self.coordinator.submit(request, signature).await
    }

    /// Send a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.request::<Value>(Method::GET, url, None).await
    }

    /// Send a `GET` request for localized content.
    ///
    /// Every `{lang}` in `template` is replaced by the language code. If the
    /// API has no content in `language`, the request is repeated once in
    /// the preferred available language.
    ///
    /// # Errors
    ///
    /// See [`Client::request`] and [`LanguageFallback::wrap`].
    pub async fn get_localized(&self, template: &str, language: &str) -> Result<ApiResponse> {
        let localize = |code: &str| template.replace(LANGUAGE_PLACEHOLDER, code);
        let url = localize(language);

        self.fallback
            .wrap(self.get(&url), language, |fallback| async move {
                self.get(&localize(&fallback)).await
            })
            .await
    }

    /// Send a `GET` request for localized content without falling back.
    ///
    /// Every `{lang}` in `template` is replaced by `language`. Content that is
    /// missing in that language yields `Ok(None)` instead of an error.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn get_localized_or_none(
        &self,
        template: &str,
        language: &str,
    ) -> Result<Option<ApiResponse>> {
        let url = template.replace(LANGUAGE_PLACEHOLDER, language);
        self.fallback
            .wrap_or_default(async { self.get(&url).await.map(Some) })
            .await
    }

    /// The coordinator shared by every request of this client
    #[must_use]
    pub const fn coordinator(&self) -> &Coordinator<ApiResponse> {
        &self.coordinator
    }

    /// The language fallback used by [`Client::get_localized`]
    #[must_use]
    pub fn language_fallback(&self) -> &LanguageFallback {
        &self.fallback
    }
}
