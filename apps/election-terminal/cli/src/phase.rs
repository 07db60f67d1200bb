//! Resolves a raw status snapshot into the phase the terminal acts on.

use election_types::display::{format_duration, DisplayZone};
use election_types::status::{ElectionId, ElectionStatus, StatusKind, UnrecognizedStatus};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolvedPhase {
    NoElection {
        message: String,
    },
    Pending {
        election_id: Option<ElectionId>,
        name: Option<String>,
        start_at: Option<OffsetDateTime>,
        end_at: Option<OffsetDateTime>,
        /// Time until voting opens, clamped at zero. `None` when the service
        /// did not say when that is.
        starts_in: Option<Duration>,
        message: String,
    },
    Active {
        election_id: Option<ElectionId>,
        name: Option<String>,
        start_at: Option<OffsetDateTime>,
        end_at: Option<OffsetDateTime>,
        /// The service still reports the election active although `end_at`
        /// has passed. The next poll is expected to correct it.
        stale: bool,
        message: String,
    },
    Ended {
        election_id: Option<ElectionId>,
        name: Option<String>,
        start_at: Option<OffsetDateTime>,
        end_at: Option<OffsetDateTime>,
        message: String,
    },
}

/// Derives the phase from `status` as of `now`. Pure: the same inputs always
/// give the same phase.
pub(crate) fn resolve(
    status: &ElectionStatus,
    now: OffsetDateTime,
) -> Result<ResolvedPhase, UnrecognizedStatus> {
    let message = status.message.clone();
    let election_id = status.election_id.clone();
    let name = status.name.clone();

    Ok(match status.kind()? {
        StatusKind::NoElection => ResolvedPhase::NoElection { message },
        StatusKind::Pending => ResolvedPhase::Pending {
            election_id,
            name,
            start_at: status.start_at,
            end_at: status.end_at,
            starts_in: status
                .start_at
                .map(|start_at| (start_at - now).max(Duration::ZERO)),
            message,
        },
        StatusKind::Active => ResolvedPhase::Active {
            election_id,
            name,
            start_at: status.start_at,
            end_at: status.end_at,
            stale: status.end_at.is_some_and(|end_at| end_at <= now),
            message,
        },
        StatusKind::Ended => ResolvedPhase::Ended {
            election_id,
            name,
            start_at: status.start_at,
            end_at: status.end_at,
            message,
        },
    })
}

impl ResolvedPhase {
    /// What to show for a status this client cannot interpret.
    pub(crate) fn or_no_election(
        resolved: Result<Self, UnrecognizedStatus>,
        status: &ElectionStatus,
    ) -> Self {
        resolved.unwrap_or_else(|_| Self::NoElection {
            message: status.message.clone(),
        })
    }

    pub(crate) fn kind(&self) -> StatusKind {
        match self {
            Self::NoElection { .. } => StatusKind::NoElection,
            Self::Pending { .. } => StatusKind::Pending,
            Self::Active { .. } => StatusKind::Active,
            Self::Ended { .. } => StatusKind::Ended,
        }
    }

    pub(crate) fn election_id(&self) -> Option<&ElectionId> {
        match self {
            Self::NoElection { .. } => None,
            Self::Pending { election_id, .. }
            | Self::Active { election_id, .. }
            | Self::Ended { election_id, .. } => election_id.as_ref(),
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        match self {
            Self::NoElection { .. } => None,
            Self::Pending { name, .. } | Self::Active { name, .. } | Self::Ended { name, .. } => {
                name.as_deref()
            }
        }
    }

    pub(crate) fn message(&self) -> &str {
        match self {
            Self::NoElection { message }
            | Self::Pending { message, .. }
            | Self::Active { message, .. }
            | Self::Ended { message, .. } => message,
        }
    }

    /// When voting opens and closes, as far as the service has said.
    pub(crate) fn schedule(&self) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
        match self {
            Self::NoElection { .. } => (None, None),
            Self::Pending {
                start_at, end_at, ..
            }
            | Self::Active {
                start_at, end_at, ..
            }
            | Self::Ended {
                start_at, end_at, ..
            } => (*start_at, *end_at),
        }
    }

    /// The instant the countdown runs to: the close of voting, while voting
    /// is open.
    pub(crate) fn countdown_target(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Active { end_at, .. } => *end_at,
            _ => None,
        }
    }

    /// When a pending election opens.
    pub(crate) fn opens_at(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Pending { start_at, .. } => *start_at,
            _ => None,
        }
    }

    pub(crate) fn is_voting_open(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub(crate) fn is_stale(&self) -> bool {
        matches!(self, Self::Active { stale: true, .. })
    }

    /// One-line summary with times in `zone`.
    pub(crate) fn describe(&self, zone: &DisplayZone) -> String {
        match self {
            Self::NoElection { .. } => "No active election".to_owned(),
            Self::Pending {
                start_at,
                starts_in,
                ..
            } => match starts_in {
                Some(starts_in) => format!(
                    "Election starts: {} (in {})",
                    zone.format_absolute(*start_at),
                    format_duration(starts_in.whole_seconds().unsigned_abs())
                ),
                None => format!("Election starts: {}", zone.format_absolute(*start_at)),
            },
            Self::Active { end_at, .. } => {
                format!("Election active - Ends: {}", zone.format_absolute(*end_at))
            }
            Self::Ended { .. } => "Election has ended".to_owned(),
        }
    }
}
