//! Error types for zipline

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for zipline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid HTTP request
    #[error("Invalid HTTP request: {0}")]
    InvalidRequest(String),

    /// Request body declared an encoding it does not actually carry
    #[error("Malformed request body: {0}")]
    MalformedBody(#[source] std::io::Error),

    /// Reading the request body failed
    #[error("Failed to read request body: {0}")]
    Body(String),

    /// Route not found
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// Compression failure scoped to a single response
    #[error("gzip: {context}: {source}")]
    Compression {
        /// What the middleware was doing when it failed
        context: &'static str,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(String),

    /// Handler panicked while serving the request
    #[error("Handler panicked: {0}")]
    Panic(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::InvalidRequest(_) | Error::MalformedBody(_) | Error::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a compression error
    pub fn compression(context: &'static str, source: std::io::Error) -> Self {
        Error::Compression { context, source }
    }
}
