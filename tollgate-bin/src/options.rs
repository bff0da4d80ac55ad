use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use http::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::{fs, path::PathBuf, str::FromStr};
use strum::{Display, EnumString, VariantNames};
use tollgate_lib::{
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, LanguageConfig, RateLimitConfig, SignatureConfig,
};
use url::Url;

pub(crate) const TOLLGATE_CONFIG_FILE: &str = "tollgate.toml";

const DEFAULT_METHOD: &str = "get";

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    TOLLGATE_CONFIG_FILE,
);

/// How fetched responses are printed
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OutputFormat {
    /// One line per response with status, method and URL
    #[default]
    Plain,
    /// A JSON array with one object per response
    Json,
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    timeout: u64 = DEFAULT_TIMEOUT_SECS;
    method: String = DEFAULT_METHOD.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected to be in format `Header-Name: Header-Value`.
/// The header name and value are trimmed of whitespace.
///
/// If the header contains multiple colons, the part after the first colon is
/// considered the value.
///
/// # Errors
///
/// This fails if the header does not contain a `:` character or
/// if the header name contains non-ASCII characters.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let parts: Vec<&str> = header.splitn(2, ':').collect();
    match parts.as_slice() {
        [name, value] => {
            let name = name.trim();
            let name = HeaderName::from_str(name)
                .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
            Ok((name, value))
        }
        _ => Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        )),
    }
}

/// Parses a single HTTP header into a tuple of (String, String)
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let header_str = value.to_str().ok_or_else(|| {
            clap::Error::raw(
                clap::error::ErrorKind::InvalidValue,
                "Header value contains invalid UTF-8",
            )
        })?;

        match parse_single_header(header_str) {
            Ok((name, value)) => {
                let Ok(value) = value.to_str() else {
                    return Err(clap::Error::raw(
                        clap::error::ErrorKind::InvalidValue,
                        "Header value contains invalid UTF-8",
                    ));
                };

                Ok((name.to_string(), value.to_string()))
            }
            Err(e) => Err(clap::Error::raw(
                clap::error::ErrorKind::InvalidValue,
                e.to_string(),
            )),
        }
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value '{value}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// tollgate fetches URLs from a rate-limited HTTP API.
///
/// Identical requests are sent only once, rate-limited requests are retried
/// with exponential backoff, and new requests wait while the API cools down.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct TollgateOptions {
    /// URLs to fetch. With `--language`, `{lang}` in a URL is replaced by the
    /// language code.
    #[arg(name = "urls", required = true)]
    pub(crate) urls: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for tollgate
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Website timeout in seconds from connect to response finished
    #[arg(short, long, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// Request method
    // Using `-X` as a short param similar to curl
    #[arg(short = 'X', long, default_value = DEFAULT_METHOD)]
    #[serde(default = "method")]
    pub(crate) method: String,

    #[arg(
        short = 'H',
        long,
        action = clap::ArgAction::Append,
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for requests

Specify custom headers in the format 'Name: Value'. For example, 'Accept: application/json'.
Multiple headers can be specified by using the flag multiple times.
The specified headers are used for ALL requests."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// JSON request body, sent with every request
    #[arg(short, long, value_name = "JSON")]
    #[serde(default)]
    pub(crate) body: Option<String>,

    /// Content language. Replaces `{lang}` in URLs and falls back to an
    /// available language if the API has no content in this one.
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) language: Option<String>,

    /// Endpoint listing the available content languages
    #[arg(long, value_name = "URL")]
    #[serde(default)]
    pub(crate) languages_url: Option<Url>,

    /// Print only the response bodies
    #[arg(long)]
    #[serde(default)]
    pub(crate) body_only: bool,

    /// Output format
    #[arg(short, long, default_value = "plain", value_parser = PossibleValuesParser::new(OutputFormat::VARIANTS).map(|s| s.parse::<OutputFormat>().unwrap()))]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    // The sections below are only available in TOML
    #[arg(skip)]
    #[serde(default)]
    pub(crate) rate_limit: RateLimitConfig,

    #[arg(skip)]
    #[serde(default)]
    pub(crate) languages: LanguageConfig,

    #[arg(skip)]
    #[serde(default)]
    pub(crate) signature: SignatureConfig,
}

impl Config {
    fn merge_headers(&mut self, other: &[(String, String)]) {
        // Header names are case-insensitive
        let normalize = |(name, value): &(String, String)| (name.to_lowercase(), value.clone());
        let self_map = self.header.iter().map(normalize).collect::<HashMap<_, _>>();
        let other_map = other.iter().map(normalize).collect::<HashMap<_, _>>();

        // Merge the two maps, with `self` (the command line) taking precedence
        let merged_map: HashMap<_, _> = other_map.into_iter().chain(self_map).collect();

        self.header = merged_map.into_iter().collect();
    }

    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// The language settings, with `--languages-url` taking precedence
    pub(crate) fn language_config(&self) -> LanguageConfig {
        let mut languages = self.languages.clone();
        if let Some(url) = &self.languages_url {
            languages.languages_url = Some(url.clone());
        }
        languages
    }

    pub(crate) fn merge(&mut self, toml: Config) {
        // Special handling for headers before fold_in!
        self.merge_headers(&toml.header);

        // These sections are only available in TOML
        self.rate_limit = toml.rate_limit;
        self.languages = toml.languages;
        self.signature = toml.signature;

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,
                ..rate_limit,
                ..languages,
                ..signature,

                // Keys with defaults to assign
                body: None,
                body_only: false,
                format: OutputFormat::default(),
                language: None,
                languages_url: None,
                method: DEFAULT_METHOD,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
            }
        }
    }
}
