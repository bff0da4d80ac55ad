//! `tollgate` is a library for talking to rate-limited HTTP APIs.
//!
//! Requests are sent through a [`Client`], which merges identical requests
//! that are in flight at the same time, retries rate-limited requests with
//! exponential backoff and holds back new requests while the API is
//! cooling down:
//!
//! ```no_run
//! use tollgate_lib::{ClientBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::default().client()?;
//!   let response = client.get("https://api.example.com/articles").await?;
//!   println!("{}", response.text);
//!   Ok(())
//! }
//! ```
//!
//! Localized endpoints can fall back to another language when the requested
//! translation does not exist:
//!
//! ```no_run
//! use tollgate_lib::{ClientBuilder, LanguageConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let language = LanguageConfig {
//!     languages_url: Some("https://api.example.com/languages".parse().unwrap()),
//!     ..LanguageConfig::default()
//!   };
//!   let client = ClientBuilder::builder().language(language).build().client()?;
//!   let article = client
//!     .get_localized("https://api.example.com/{lang}/articles/1", "fr")
//!     .await?;
//!   println!("{}", article.text);
//!   Ok(())
//! }
//! ```
//!
//! The [`Coordinator`] underneath the client works with any transport that
//! reports an [`Outcome`].
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod coordinator;
mod language;
mod signature;
mod types;

pub mod ratelimit;

#[cfg(test)]
mod test_utils;

pub use crate::{
    client::{
        ApiLanguages, Client, ClientBuilder, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
        LANGUAGE_PLACEHOLDER,
    },
    coordinator::{Coordinator, Pending, Phase, RequestFn},
    language::{
        DEFAULT_LANGUAGE, LanguageCache, LanguageConfig, LanguageFallback, LanguageSource,
        StaticLanguages,
    },
    ratelimit::RateLimitConfig,
    signature::{Digest, Signature, SignatureConfig, make_signature},
    types::{ApiResponse, ErrorKind, Outcome, Result},
};
