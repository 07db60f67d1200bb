pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTTP error: {context} status_code={status_code:?} {text}")]
    Http {
        status_code: reqwest::StatusCode,
        text: String,
        context: String,
    },

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },
}

/// How a failed call should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never got a usable answer: connection failures, timeouts,
    /// non-2xx responses without a recognizable body.
    NetworkFailure,
    /// The service answered, but not with the JSON shape we expected.
    MalformedResponse,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Reqwest(e) if e.is_decode() => ErrorKind::MalformedResponse,
            Self::Json { .. } => ErrorKind::MalformedResponse,
            Self::Reqwest(_) | Self::Http { .. } | Self::Url(_) => ErrorKind::NetworkFailure,
        }
    }
}
