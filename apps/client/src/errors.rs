#![allow(dead_code)]

use thiserror::Error;

/// Uniform error type returned by every remote-call wrapper.
///
/// The auth coordinator never sees a raw transport or parse failure; each
/// wrapper maps its outcome into one of these variants, and the coordinator
/// only ever converts them into a stored error string plus a failed result.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with an error payload. The message comes from
    /// its `msg` field and is suitable for direct display.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// A bearer-authenticated call came back 401. Signals that the held
    /// token is no longer valid.
    #[error("Your session has expired")]
    Unauthorized,

    /// A successful auth response that should have carried a token did not.
    #[error("no authentication token received")]
    MissingToken,

    /// No usable response reached us (connection refused, timeout, DNS).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response arrived but its shape was not one we recognize.
    #[error("Unexpected server response: {0}")]
    Malformed(String),

    /// Input rejected locally, before any network call was issued.
    #[error("{0}")]
    Invalid(String),
}

impl ApiError {
    /// True when the error means the current token must be discarded.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
