//! Error types
//!
//! Request-level failures are `UploadError`s, each mapped to exactly one
//! status code and one user-facing line. Process-level failures are
//! `ServerError`s.

use hyper::{Method, StatusCode};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure at one step of the upload pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("/images endpoint only supports POST requests, got {0}")]
    MethodNotAllowed(Method),

    #[error("request body exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },

    #[error("malformed multipart form: {0}")]
    Form(#[source] multer::Error),

    #[error("request is not multipart/form-data")]
    NotMultipart,

    #[error("form field `image` is missing or is not a file")]
    MissingField,

    #[error("unusable upload filename {0:?}")]
    InvalidFilename(String),

    #[error("error reading file to determine content type: {0}")]
    Sniff(#[source] io::Error),

    #[error("user uploaded an unacceptable file format ({0})")]
    UnsupportedType(&'static str),

    #[error("error storing uploaded file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error writing uploaded file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    /// HTTP status reported to the client
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Form(_)
            | Self::NotMultipart
            | Self::MissingField
            | Self::InvalidFilename(_)
            | Self::Create { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            Self::Sniff(_) | Self::Write { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// One-line body sent to the client. Never includes server paths.
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "/images endpoint only supports POST requests\n",
            Self::TooLarge { .. } => "Upload exceeds the maximum allowed size\n",
            Self::Form(_) | Self::NotMultipart | Self::MissingField | Self::InvalidFilename(_) => {
                "Error handling file upload\n"
            }
            Self::UnsupportedType(_) => "Error handling file upload, please only upload images\n",
            Self::Create { .. } => "Error storing uploaded file, please try again\n",
            Self::Sniff(_) | Self::Write { .. } => "Something went wrong, please try again\n",
        }
    }

    /// Client mistakes are warnings, I/O trouble on our side is an error
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Sniff(_) | Self::Create { .. } | Self::Write { .. }
        )
    }
}

impl From<multer::Error> for UploadError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } => Self::TooLarge { limit },
            other => Self::Form(other),
        }
    }
}

/// Server lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error("request not completed within {0:?}")]
    RequestTimeout(Duration),

    #[error("in-flight connections did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            UploadError::MethodNotAllowed(Method::DELETE).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(UploadError::MissingField.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            UploadError::UnsupportedType("text/plain; charset=utf-8").status(),
            StatusCode::BAD_REQUEST
        );
        let sniff = UploadError::Sniff(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(sniff.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sniff.is_server_fault());
    }

    #[test]
    fn test_create_failure_is_unprocessable() {
        let err = UploadError::Create {
            path: PathBuf::from("/nowhere/x.png"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.public_message().contains("/nowhere"));
        assert!(err.to_string().contains("/nowhere/x.png"));
    }

    #[test]
    fn test_stream_limit_maps_to_too_large() {
        let err = UploadError::from(multer::Error::StreamSizeExceeded { limit: 64 });
        assert!(matches!(err, UploadError::TooLarge { limit: 64 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_public_messages_are_single_lines() {
        let errors = [
            UploadError::MissingField,
            UploadError::NotMultipart,
            UploadError::UnsupportedType("application/pdf"),
            UploadError::TooLarge { limit: 1 },
        ];
        for err in errors {
            let msg = err.public_message();
            assert!(msg.ends_with('\n'));
            assert_eq!(msg.lines().count(), 1);
        }
    }
}
