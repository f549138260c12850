// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// The error type for azblob operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    code: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials exist but are invalid/malformed, for example an account
    /// key that is not valid base64.
    CredentialInvalid,

    /// Credentials are expired
    CredentialExpired,

    /// Request cannot be built or signed (missing required fields, values
    /// violating naming rules, etc.). Never sent over the wire.
    RequestInvalid,

    /// A SAS or access policy whose start is not before its expiry.
    InvalidTimeRange,

    /// A resource url that can't be parsed into scheme, host and path.
    UrlInvalid,

    /// Configuration error (missing fields, invalid values, malformed
    /// connection string)
    ConfigInvalid,

    /// Connection reset, timeout or unexpected EOF. Safe to retry.
    Transient,

    /// The blob changed between two range reads of the same download.
    ContentChanged,

    /// The service answered with a non-2xx status.
    Service,

    /// The caller canceled the operation.
    Canceled,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the http status returned by the service.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the service error code, for example `ConditionNotMet`.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the http status if this error came from a service response.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Get the service error code if the service returned one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Check if this error is worth another attempt.
    ///
    /// Only network level failures are transient. Caller cancellation and
    /// service responses are not.
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

// Convenience constructors
impl Error {
    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a credential expired error
    pub fn credential_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialExpired, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an invalid time range error
    pub fn invalid_time_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTimeRange, message)
    }

    /// Create an url invalid error
    pub fn url_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UrlInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    /// Create a content changed error
    pub fn content_changed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContentChanged, message)
    }

    /// Create a service error
    pub fn service(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, message).with_status(status)
    }

    /// Create a canceled error
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canceled, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::CredentialExpired => write!(f, "expired credentials"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::InvalidTimeRange => write!(f, "invalid time range"),
            ErrorKind::UrlInvalid => write!(f, "malformed url"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Transient => write!(f, "transient network error"),
            ErrorKind::ContentChanged => write!(f, "content changed"),
            ErrorKind::Service => write!(f, "service error"),
            ErrorKind::Canceled => write!(f, "canceled"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::url_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Self::unexpected(format!("failed to parse xml: {err}"))
            .with_source(anyhow::Error::from(err))
    }
}

impl From<quick_xml::SeError> for Error {
    fn from(err: quick_xml::SeError) -> Self {
        Self::request_invalid(format!("failed to build xml: {err}"))
            .with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;

        let kind = match err.kind() {
            IoKind::ConnectionReset
            | IoKind::ConnectionAborted
            | IoKind::BrokenPipe
            | IoKind::TimedOut
            | IoKind::UnexpectedEof
            | IoKind::Interrupted => ErrorKind::Transient,
            _ => ErrorKind::Unexpected,
        };
        Self::new(kind, err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(std::io::ErrorKind::ConnectionReset, true; "connection reset")]
    #[test_case(std::io::ErrorKind::UnexpectedEof, true; "unexpected eof")]
    #[test_case(std::io::ErrorKind::TimedOut, true; "timed out")]
    #[test_case(std::io::ErrorKind::PermissionDenied, false; "permission denied")]
    #[test_case(std::io::ErrorKind::NotFound, false; "not found")]
    fn test_io_error_classification(kind: std::io::ErrorKind, transient: bool) {
        let err: Error = std::io::Error::new(kind, "boom").into();
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn test_service_error_carries_status_and_code() {
        let err = Error::service(StatusCode::PRECONDITION_FAILED, "condition not met")
            .with_code("ConditionNotMet");

        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.status(), Some(StatusCode::PRECONDITION_FAILED));
        assert_eq!(err.code(), Some("ConditionNotMet"));
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "service error: condition not met");
    }
}
