use http::StatusCode;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;

/// Possible errors when sending requests through `tollgate_lib`.
///
/// Every variant is cheap to clone: a single settled request is delivered to
/// all callers that joined it, so the error has to be shared between them.
/// Wrapped third-party errors are therefore kept behind an [`Arc`].
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while handling the request
    #[error("Network error")]
    NetworkRequest(#[source] Arc<reqwest::Error>),

    /// Cannot read the body of the received response
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] Arc<reqwest::Error>),

    /// The HTTP client cannot be created
    #[error("Error creating request client: {0}")]
    BuildClient(#[source] Arc<reqwest::Error>),

    /// The server answered with a status code that is neither a success nor
    /// a rate-limit signal
    #[error("Rejected status code {status}: {body}")]
    RejectedStatusCode {
        /// The rejected status code
        status: StatusCode,
        /// The response body, kept for diagnostics
        body: String,
    },

    /// The requested content does not exist in the requested language
    #[error("No content available for language '{language}'")]
    LanguageUnavailable {
        /// The language that has no content
        language: String,
    },

    /// The response body could not be decoded as the expected JSON document
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[source] Arc<serde_json::Error>),

    /// A request body could not be serialized for signing or sending
    #[error("Cannot serialize request body: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),

    /// The given URL cannot be parsed
    #[error("Cannot parse '{0}' as URL: {1}")]
    InvalidUrl(String, #[source] url::ParseError),

    /// A configured header could not be parsed
    #[error("Header could not be parsed: {0}")]
    InvalidHeader(String),

    /// The request was still rate limited after the configured retry ceiling
    #[error("Request {signature} still rate limited after {retries} retries")]
    RetriesExhausted {
        /// Signature of the abandoned request
        signature: String,
        /// Number of retries that were attempted
        retries: u32,
    },

    /// The request was waiting in the cooldown queue when the queue was cleared
    #[error("Request was cancelled while waiting in the cooldown queue")]
    QueueCancelled,

    /// The task driving the request panicked or was aborted
    #[error("Request execution aborted: {0}")]
    ExecutionAborted(String),
}

impl ErrorKind {
    /// The language whose content is missing, if this error is the
    /// "no content for language" signal.
    #[must_use]
    pub fn unavailable_language(&self) -> Option<&str> {
        match self {
            Self::LanguageUnavailable { language } => Some(language),
            _ => None,
        }
    }

    /// Status code of the response which caused this error, if any
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RejectedStatusCode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Was this request rejected by [`Coordinator::clear_queue`](crate::Coordinator::clear_queue)?
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::QueueCancelled)
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NetworkRequest(e1), Self::NetworkRequest(e2))
            | (Self::ReadResponseBody(e1), Self::ReadResponseBody(e2))
            | (Self::BuildClient(e1), Self::BuildClient(e2)) => e1.to_string() == e2.to_string(),
            (
                Self::RejectedStatusCode { status: s1, body: b1 },
                Self::RejectedStatusCode { status: s2, body: b2 },
            ) => s1 == s2 && b1 == b2,
            (
                Self::LanguageUnavailable { language: l1 },
                Self::LanguageUnavailable { language: l2 },
            ) => l1 == l2,
            (Self::InvalidJson(e1), Self::InvalidJson(e2))
            | (Self::Serialization(e1), Self::Serialization(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (Self::InvalidUrl(u1, e1), Self::InvalidUrl(u2, e2)) => u1 == u2 && e1 == e2,
            (Self::InvalidHeader(h1), Self::InvalidHeader(h2))
            | (Self::ExecutionAborted(h1), Self::ExecutionAborted(h2)) => h1 == h2,
            (
                Self::RetriesExhausted { signature: s1, retries: r1 },
                Self::RetriesExhausted { signature: s2, retries: r2 },
            ) => s1 == s2 && r1 == r2,
            (Self::QueueCancelled, Self::QueueCancelled) => true,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<tokio::task::JoinError> for ErrorKind {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::ExecutionAborted(e.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ErrorKind {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ErrorKind {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}
