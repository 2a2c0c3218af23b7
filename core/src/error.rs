//! Error taxonomy for network-backed features.
//!
//! [`NetworkError`] is a closed set of failure kinds. Domain-specific failures
//! are their own small enums wrapped by exactly one `NetworkError` variant, so
//! a caller can always match down to the precise cause.
//!
//! Every value carries a deterministic, non-empty description through
//! `Display` (and [`NetworkError::description`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures a network-backed request can report.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// The request could not be constructed from its inputs
    #[error("Error creating request")]
    RequestCreation,

    /// The access token was rejected
    #[error("The access token is invalid.")]
    InvalidAccessToken,

    /// A downloaded blob could not be decoded into an image
    #[error("Blob image decoding failed.")]
    BlobImageDecodingFailed,

    /// Free-form failure reported by a collaborator
    #[error("{}", non_empty(.0, "Network request failed."))]
    NetworkFailure(String),

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A token did not have the expected shape
    #[error(transparent)]
    TokenFormat(#[from] TokenFormatError),

    /// A server-side resource limit was hit
    #[error(transparent)]
    ResourceLimit(#[from] ResourceLimitError),
}

impl NetworkError {
    /// Human-readable description, never empty
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Whether retrying the same request may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::NetworkFailure(_) | Self::Transport(_) => true,
            Self::RequestCreation
            | Self::InvalidAccessToken
            | Self::BlobImageDecodingFailed
            | Self::TokenFormat(_)
            | Self::ResourceLimit(_) => false,
        }
    }
}

/// Details of a failure in the transport layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[error("{}", transport_description(.code, .message))]
pub struct TransportError {
    /// Transport-specific error code
    pub code: i32,
    /// Message reported by the transport
    pub message: String,
}

impl TransportError {
    /// Code used for requests abandoned by the driver's timer
    pub const TIMED_OUT: i32 = -1001;

    /// Code used for requests aborted on purpose
    pub const CANCELLED: i32 = -999;

    /// Create a transport error
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The request did not finish before its deadline
    #[must_use]
    pub fn timed_out() -> Self {
        Self::new(Self::TIMED_OUT, "The request timed out.")
    }

    /// The request was aborted
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(Self::CANCELLED, "cancelled")
    }
}

/// Malformed token errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenFormatError {
    /// Expected `/<data center>/<temp id>/<token>`,
    /// e.g. `/dc1/_T197/54babd3f-72ca-4776-99df-048969f764bc-106149_570492940`
    #[error("Sik Token is not in the form /<data center>/<temp id>/<token>")]
    InvalidSikToken,
}

/// Server-side resource limit errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceLimitError {
    /// No more estimates can be created
    #[error("Maximum number of estimates already exist.")]
    MaxEstimateExceeded,
}

fn non_empty<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.is_empty() {
        fallback
    } else {
        message
    }
}

fn transport_description(code: &i32, message: &str) -> String {
    if message.is_empty() {
        format!("Transport error (code {code})")
    } else {
        message.to_string()
    }
}
