//! Collaborator call failures.

use thiserror::Error;

use seatkeeper_core::error::{AppError, ErrorKind};

/// Failure of a call to an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The collaborator could not be reached, timed out, or answered 5xx.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// Collaborator name.
        service: &'static str,
        /// Last failure seen.
        message: String,
    },

    /// The collaborator answered with a client error.
    #[error("{service} rejected the request ({status}): {message}")]
    Rejected {
        /// Collaborator name.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        /// Collaborator name.
        service: &'static str,
        /// Decoder message.
        message: String,
    },

    /// Client construction failed.
    #[error("Collaborator configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Shorthand for [`ClientError::Unavailable`].
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let kind = match &err {
            ClientError::Unavailable { .. } => ErrorKind::ServiceUnavailable,
            ClientError::Rejected { .. } | ClientError::Decode { .. } => {
                ErrorKind::ExternalService
            }
            ClientError::Configuration(_) => ErrorKind::Configuration,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
