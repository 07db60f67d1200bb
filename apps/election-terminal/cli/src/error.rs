use election_api_client::ErrorKind;
use election_types::status::UnrecognizedStatus;

use crate::store::StoreError;

/// Failures the terminal reports to the user. None of them end a watch
/// session.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("could not reach the election service: {0}")]
    NetworkFailure(#[source] election_api_client::Error),

    #[error("the election service sent an unexpected response: {0}")]
    MalformedResponse(#[source] election_api_client::Error),

    #[error(transparent)]
    UnrecognizedStatus(#[from] UnrecognizedStatus),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

impl From<election_api_client::Error> for Error {
    fn from(error: election_api_client::Error) -> Self {
        match error.kind() {
            ErrorKind::NetworkFailure => Self::NetworkFailure(error),
            ErrorKind::MalformedResponse => Self::MalformedResponse(error),
        }
    }
}

impl Error {
    /// Short message suitable for showing next to the last known state.
    pub(crate) fn user_message(&self) -> &'static str {
        match self {
            Self::NetworkFailure(_) => "Unable to reach the election service",
            Self::MalformedResponse(_) => "The election service returned an unexpected response",
            Self::UnrecognizedStatus(_) => "Unknown election status",
            Self::Store(_) => "Unable to read or write local state",
        }
    }
}
