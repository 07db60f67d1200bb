use serde::{Deserialize, Serialize};

use crate::util::idtype;

idtype!(UserId);
idtype!(PositionId);
idtype!(CandidateId);

/// A registered voter as returned by `POST user/signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub position_id: Option<PositionId>,
    #[serde(default)]
    pub position_name: Option<String>,
    /// Only present on admin listings.
    #[serde(default)]
    pub votes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
}

/// Response body of `GET user/{id}/votes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVotes {
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

impl UserVotes {
    pub fn candidate_for(&self, position_id: PositionId) -> Option<CandidateId> {
        self.votes
            .iter()
            .find(|vote| vote.position_id == position_id)
            .map(|vote| vote.candidate_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CastVoteRequest {
    pub user_id: UserId,
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigninResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `{success, message}` envelope most mutating endpoints answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    /// The server's message, or `fallback` when it did not send one.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = User {
            id: UserId::new(1),
            email: "voter@example.com".to_owned(),
            name: Some("Amina".to_owned()),
        };
        assert_eq!(user.display_name(), "Amina");
        user.name = Some("  ".to_owned());
        assert_eq!(user.display_name(), "voter@example.com");
        user.name = None;
        assert_eq!(user.display_name(), "voter@example.com");
    }

    #[test]
    fn test_user_votes_lookup() {
        let votes: UserVotes = serde_json::from_str(
            r#"{"votes": [{"position_id": 1, "candidate_id": 4}, {"position_id": 3, "candidate_id": 9}]}"#,
        )
        .unwrap();
        assert_eq!(votes.candidate_for(PositionId::new(3)), Some(CandidateId::new(9)));
        assert_eq!(votes.candidate_for(PositionId::new(2)), None);
    }

    #[test]
    fn test_cast_vote_request_shape() {
        let request = CastVoteRequest {
            user_id: UserId::new(5),
            position_id: PositionId::new(2),
            candidate_id: CandidateId::new(8),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"user_id": 5, "position_id": 2, "candidate_id": 8})
        );
    }

    #[test]
    fn test_id_from_str() {
        assert_eq!(" 12 ".parse::<PositionId>(), Ok(PositionId::new(12)));
        assert!("twelve".parse::<PositionId>().is_err());
    }
}
