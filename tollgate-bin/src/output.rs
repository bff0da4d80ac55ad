//! Printing of fetched responses.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tollgate_lib::{ApiResponse, ErrorKind};

use crate::options::OutputFormat;

/// The result of fetching one URL given on the command line
#[derive(Debug, Clone)]
pub(crate) struct Fetched {
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) result: Result<ApiResponse, ErrorKind>,
}

impl Fetched {
    pub(crate) const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// JSON representation of a [`Fetched`] result
#[derive(Debug, Serialize)]
struct Report<'a> {
    method: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorKind>,
}

impl<'a> From<&'a Fetched> for Report<'a> {
    fn from(fetched: &'a Fetched) -> Self {
        let (status, body, error) = match &fetched.result {
            Ok(response) => (Some(response.status.as_u16()), Some(&*response.text), None),
            Err(e) => (e.status().map(|s| s.as_u16()), None, Some(e)),
        };
        Report {
            method: &fetched.method,
            url: &fetched.url,
            status,
            body,
            error,
        }
    }
}

/// Write all results to `out` in the requested format.
///
/// With `body_only`, only the bodies of successful responses are written;
/// failures are left to the log.
pub(crate) fn write_results<W: Write>(
    out: &mut W,
    results: &[Fetched],
    format: OutputFormat,
    body_only: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let reports: Vec<Report<'_>> = results.iter().map(Report::from).collect();
            serde_json::to_writer_pretty(&mut *out, &reports)?;
            writeln!(out)?;
        }
        OutputFormat::Plain if body_only => {
            for fetched in results {
                if let Ok(response) = &fetched.result {
                    writeln!(out, "{}", response.text)?;
                }
            }
        }
        OutputFormat::Plain => {
            for fetched in results {
                match &fetched.result {
                    Ok(response) => writeln!(
                        out,
                        "[{}] {} {} ({} bytes)",
                        response.status.as_u16(),
                        fetched.method,
                        fetched.url,
                        response.text.len()
                    )?,
                    Err(e) => writeln!(out, "[ERROR] {} {}: {e}", fetched.method, fetched.url)?,
                }
            }
        }
    }
    Ok(())
}
