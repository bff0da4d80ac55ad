use crate::ErrorKind;

/// The tagged result of a single transport call.
///
/// Transports report rate limiting explicitly instead of burying it in an
/// error value, so the retry engine never has to inspect status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The call succeeded
    Ok(T),
    /// The remote API signalled that its throughput cap was hit (HTTP 429)
    RateLimited,
    /// Any other failure; it is reported to the caller and never retried
    Failed(ErrorKind),
}

impl<T> Outcome<T> {
    /// Returns `true` if the transport signalled rate limiting
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Map the success value, leaving the other variants untouched
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::RateLimited => Outcome::RateLimited,
            Self::Failed(e) => Outcome::Failed(e),
        }
    }
}

impl<T> From<Result<T, ErrorKind>> for Outcome<T> {
    fn from(result: Result<T, ErrorKind>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Failed(e),
        }
    }
}
