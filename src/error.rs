//! Error types for devconsole.
//!
//! Every fallible operation in the crate returns [`Error`]. The variants follow
//! the taxonomy the console surfaces to the operator: transport failures,
//! backend-reported failures (which carry the backend's `detail` text),
//! stream-protocol failures, and client-side validation failures.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for devconsole.
#[derive(Clone, Debug)]
pub enum Error {
    /// The backend answered with a non-success status not covered below.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// The backend's `detail` text, or the raw body when none was given.
        detail: String,
    },

    /// The backend rejected the request as malformed (HTTP 400).
    BadRequest {
        /// Backend detail text.
        detail: String,
    },

    /// The backend could not find the resource (HTTP 404), e.g. an expired session.
    NotFound {
        /// Backend detail text.
        detail: String,
        /// The session or path that was not found, if known.
        resource_id: Option<String>,
    },

    /// The backend failed while processing the request (HTTP 500).
    InternalServer {
        /// Backend detail text.
        detail: String,
    },

    /// The backend is misconfigured or unavailable (HTTP 502-504).
    ServiceUnavailable {
        /// Backend detail text.
        detail: String,
    },

    /// A request or stream timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The backend could not be reached.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Any other HTTP client failure.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON or YAML serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// The NDJSON stream misbehaved: a malformed line or a premature end.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A locally staged value failed validation.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field that failed validation.
        param: Option<String>,
    },

    /// A query is already streaming for this session.
    Busy {
        /// Human-readable error message.
        message: String,
    },

    /// The operation needs a session id and none is set.
    NoSession,

    /// The file extension is not on the attachment allow-list.
    UnsupportedFile {
        /// Name of the rejected file.
        filename: String,
        /// The offending extension, if the file had one.
        extension: Option<String>,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, detail: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            detail: detail.into(),
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Error::BadRequest {
            detail: detail.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(detail: impl Into<String>, resource_id: Option<String>) -> Self {
        Error::NotFound {
            detail: detail.into(),
            resource_id,
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(detail: impl Into<String>) -> Self {
        Error::InternalServer {
            detail: detail.into(),
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            detail: detail.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new busy error.
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy {
            message: message.into(),
        }
    }

    /// Creates a new unsupported file error.
    pub fn unsupported_file(filename: impl Into<String>, extension: Option<String>) -> Self {
        Error::UnsupportedFile {
            filename: filename.into(),
            extension,
        }
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this error is a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error is a stream-protocol error.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if a query was already in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy { .. })
    }

    /// Returns true if the operation needed a session id.
    pub fn is_no_session(&self) -> bool {
        matches!(self, Error::NoSession)
    }

    /// Returns the backend's detail text if the backend reported this error.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Api { detail, .. }
            | Error::BadRequest { detail }
            | Error::NotFound { detail, .. }
            | Error::InternalServer { detail }
            | Error::ServiceUnavailable { detail } => Some(detail),
            _ => None,
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::BadRequest { .. } => Some(400),
            Error::NotFound { .. } => Some(404),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }

    /// Returns true if this error concerns a single stream line and the
    /// stream it came from is still usable.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Error::Serialization { .. } | Error::Encoding { .. })
    }

    /// The text shown to the operator: the backend's detail when it sent one,
    /// otherwise the full error.
    pub fn user_message(&self) -> String {
        match self.detail() {
            Some(detail) => detail.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                detail,
            } => write!(f, "Backend error ({status_code}): {detail}"),
            Error::BadRequest { detail } => write!(f, "Bad request: {detail}"),
            Error::NotFound {
                detail,
                resource_id,
            } => {
                if let Some(resource_id) = resource_id {
                    write!(f, "Not found: {detail} [ID: {resource_id}]")
                } else {
                    write!(f, "Not found: {detail}")
                }
            }
            Error::InternalServer { detail } => write!(f, "Internal server error: {detail}"),
            Error::ServiceUnavailable { detail } => write!(f, "Service unavailable: {detail}"),
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => write!(f, "Connection error: {message}"),
            Error::HttpClient { message, .. } => write!(f, "HTTP client error: {message}"),
            Error::Serialization { message, .. } => write!(f, "Serialization error: {message}"),
            Error::Io { message, .. } => write!(f, "I/O error: {message}"),
            Error::Url { message, .. } => write!(f, "URL error: {message}"),
            Error::Streaming { message, .. } => write!(f, "Streaming error: {message}"),
            Error::Encoding { message, .. } => write!(f, "Encoding error: {message}"),
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Busy { message } => write!(f, "Busy: {message}"),
            Error::NoSession => write!(f, "No active session; create one with /new"),
            Error::UnsupportedFile {
                filename,
                extension,
            } => match extension {
                Some(extension) => {
                    write!(f, "File type .{extension} is not supported: {filename}")
                }
                None => write!(f, "File type is not supported: {filename}"),
            },
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for devconsole operations.
pub type Result<T> = std::result::Result<T, Error>;
