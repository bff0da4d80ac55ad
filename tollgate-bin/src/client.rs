use crate::options::{Config, HeaderMapExt};
use anyhow::{Context, Result};
use http::HeaderMap;
use std::time::Duration;
use tollgate_lib::{Client, ClientBuilder};

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;

    ClientBuilder::builder()
        .user_agent(cfg.user_agent.clone())
        .custom_headers(headers)
        .timeout(Duration::from_secs(cfg.timeout))
        .rate_limit(cfg.rate_limit)
        .language(cfg.language_config())
        .signature(cfg.signature)
        .build()
        .client()
        .context("Failed to create request client")
}
