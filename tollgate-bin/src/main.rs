//! `tollgate` fetches URLs from a rate-limited HTTP API.
//!
//! The tollgate binary is a wrapper around tollgate-lib, which provides
//! convenience functions for calling tollgate from the command-line.
//!
//! Fetch a few resources at once; identical URLs are requested only once:
//! ```sh
//! tollgate https://api.example.com/articles/1 https://api.example.com/articles/2
//! ```
//!
//! Fetch localized content, falling back to an available language:
//! ```sh
//! tollgate --language fr --languages-url https://api.example.com/languages \
//!     "https://api.example.com/{lang}/articles/1"
//! ```
//!
//! Send a JSON body and print the responses as JSON:
//! ```sh
//! tollgate -X post --body '{"query": "rust"}' --format json https://api.example.com/search
//! ```
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

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Error, Result, bail};
use clap::{Parser, crate_version};
use futures::future::join_all;
use http::Method;
use log::{error, info};
use serde_json::Value;
use tollgate_lib::{Client, LANGUAGE_PLACEHOLDER};

mod client;
mod logging;
mod options;
mod output;
mod verbosity;

use crate::logging::init_logging;
use crate::options::{Config, TOLLGATE_CONFIG_FILE, TollgateOptions};
use crate::output::{Fetched, write_results};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    RequestFailure = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file and command-line arguments
fn load_config() -> Result<TollgateOptions> {
    let mut opts = TollgateOptions::parse();

    init_logging(&opts.config.verbose);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // If no config file was explicitly provided, we try to load the default
        // config file from the current directory if the file exits. This will
        // raise an error if the file is invalid, just like the explicit provided
        // config file.
        let default_config = PathBuf::from(TOLLGATE_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call tollgate entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(io::ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Fetch all URLs given on the command line
async fn run(opts: &TollgateOptions) -> Result<i32> {
    let config = &opts.config;
    let method = Method::from_str(&config.method.to_uppercase())
        .with_context(|| format!("Invalid request method `{}`", config.method))?;
    let body = config
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("Request body is not valid JSON")?;

    let client = client::create(config)?;
    info!("Fetching {} URLs", opts.urls.len());
    let start = Instant::now();

    let fetches = opts.urls.iter().map(|url| {
        fetch(&client, &method, url, body.as_ref(), config.language.as_deref())
    });
    let results = join_all(fetches).await;
    // Whole milliseconds are precise enough for a summary
    let elapsed = Duration::from_millis(start.elapsed().as_millis().try_into().unwrap_or(u64::MAX));
    info!(
        "Fetched {} URLs in {}",
        results.len(),
        humantime::format_duration(elapsed)
    );

    for fetched in results.iter().filter(|f| !f.is_success()) {
        if let Err(e) = &fetched.result {
            error!("{} {}: {e}", fetched.method, fetched.url);
        }
    }

    let mut stdout = io::stdout().lock();
    write_results(&mut stdout, &results, config.format, config.body_only)?;
    stdout.flush()?;

    let exit_code = if results.iter().all(Fetched::is_success) {
        ExitCode::Success
    } else {
        ExitCode::RequestFailure
    };
    Ok(exit_code as i32)
}

/// Fetch a single URL. Localized `GET` requests go through the language
/// fallback.
async fn fetch(
    client: &Client,
    method: &Method,
    url: &str,
    body: Option<&Value>,
    language: Option<&str>,
) -> Fetched {
    let result = match language {
        Some(language) if *method == Method::GET && url.contains(LANGUAGE_PLACEHOLDER) => {
            client.get_localized(url, language).await
        }
        _ => client.request(method.clone(), url, body).await,
    };

    Fetched {
        method: method.to_string(),
        url: url.to_string(),
        result,
    }
}
