//! Request and response bodies for the `admin/*` endpoints.
//!
//! Every admin request carries the administrator's credentials in the body;
//! the service checks them on each call.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::timestamp;
use crate::voting::{Candidate, CandidateId, PositionId};

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AdminCredentials {
    pub admin_name: String,
    pub admin_password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("admin_name", &self.admin_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

impl From<&AdminCredentials> for AdminLoginRequest {
    fn from(credentials: &AdminCredentials) -> Self {
        Self {
            username: credentials.admin_name.clone(),
            password: credentials.admin_password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCandidateRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub position_id: PositionId,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteCandidateRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustVotesRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub candidate_id: CandidateId,
    /// May be negative.
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdjustVotesResponse {
    pub success: bool,
    /// The candidate's new vote total.
    #[serde(default)]
    pub votes: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Schedules (or reschedules) the election. Times are always sent in UTC.
#[derive(Debug, Clone, Serialize)]
pub struct SetElectionRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub name: String,
    #[serde(with = "timestamp")]
    pub start_at: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub end_at: OffsetDateTime,
    /// Wipe all votes and start a fresh election.
    pub reset_data: bool,
}

/// Response body of `GET admin/candidates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdminCandidates {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl AdminCandidates {
    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().filter_map(|c| c.votes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    fn credentials() -> AdminCredentials {
        AdminCredentials {
            admin_name: "admin".to_owned(),
            admin_password: "hunter2".to_owned(),
        }
    }

    #[test]
    fn test_set_election_request_shape() {
        let request = SetElectionRequest {
            credentials: credentials(),
            name: "Student Council 2025".to_owned(),
            start_at: datetime!(2025-03-01 08:00:00 +3),
            end_at: datetime!(2025-03-01 18:00:00 +3),
            reset_data: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "admin_name": "admin",
                "admin_password": "hunter2",
                "name": "Student Council 2025",
                "start_at": "2025-03-01T05:00:00Z",
                "end_at": "2025-03-01T15:00:00Z",
                "reset_data": true,
            })
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_admin_candidates_total() {
        let candidates: AdminCandidates = serde_json::from_str(
            r#"{"candidates": [
                {"id": 1, "name": "A", "position_name": "Chairperson", "votes": 4},
                {"id": 2, "name": "B", "position_name": "Chairperson"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(candidates.total_votes(), 4);
    }
}
