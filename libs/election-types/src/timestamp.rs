//! Serde helpers for the timestamps the election service sends.
//!
//! The service reports instants in UTC. Most responses use RFC 3339, but
//! naive ISO 8601 strings (no offset) also show up and are read as UTC.
//! Timestamps are always written back out as RFC 3339.

use serde::{de, Deserialize, Deserializer, Serializer};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

const NAIVE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

/// Parses an RFC 3339 timestamp, or a naive ISO 8601 one interpreted as UTC.
pub fn parse(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let value = value.trim();
    match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(datetime) => Ok(datetime),
        Err(rfc3339_error) => PrimitiveDateTime::parse(value, NAIVE_FORMAT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| rfc3339_error),
    }
}

/// Formats an instant as RFC 3339 in UTC, e.g. `2025-03-01T05:00:00Z`.
pub fn format(value: OffsetDateTime) -> Result<String, time::error::Format> {
    value.to_offset(UtcOffset::UTC).format(&Rfc3339)
}

pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = format(*value).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
    let value = String::deserialize(deserializer)?;
    parse(&value).map_err(de::Error::custom)
}

/// Same as the parent module, for `Option<OffsetDateTime>` fields. Use with
/// `#[serde(default, with = "timestamp::option")]` so that a missing field
/// and an explicit `null` both become `None`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse(&value).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}
