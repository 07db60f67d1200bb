use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::timestamp;

/// Opaque identifier distinguishing one election run from the next.
///
/// The service has sent both strings (`"BUSA2025"`) and integers (`42`) here,
/// so both are accepted and normalized to their textual form: `42` and `"42"`
/// identify the same election.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ElectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ElectionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<u64> for ElectionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ElectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Signed(number) => Self(number.to_string()),
            Raw::Unsigned(number) => Self(number.to_string()),
        })
    }
}

/// The lifecycle stage of an election as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    NoElection,
    Pending,
    Active,
    Ended,
}

impl StatusKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoElection => "no_election",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    /// Short human-readable label, e.g. for a status badge.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoElection => "No Election",
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Ended => "Ended",
        }
    }
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string the client does not know how to interpret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized election status: {0:?}")]
pub struct UnrecognizedStatus(pub String);

impl FromStr for StatusKind {
    type Err = UnrecognizedStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_election" => Ok(Self::NoElection),
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            other => Err(UnrecognizedStatus(other.to_owned())),
        }
    }
}

/// Snapshot returned by `GET election/status`. Each fetch replaces the
/// previous snapshot entirely.
///
/// `status` stays a raw string so that a value this client has never seen is
/// reported as [`UnrecognizedStatus`] instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub status: String,
    #[serde(default)]
    pub election_id: Option<ElectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub start_at: Option<OffsetDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub end_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub message: String,
}

impl ElectionStatus {
    pub fn kind(&self) -> Result<StatusKind, UnrecognizedStatus> {
        self.status.parse()
    }
}
