#![allow(unreachable_pub)]

mod error;
mod outcome;
mod response;

pub use error::ErrorKind;
pub use outcome::Outcome;
pub use response::ApiResponse;

/// The tollgate `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
