use serde::{Deserialize, Serialize};

use crate::status::ElectionId;
use crate::voting::{CandidateId, PositionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub percentage: f64,
}

/// Tally for a single position.
///
/// Once [`normalized`][PositionResult::normalized], `total_votes` is the sum
/// of the candidates' votes and every `percentage` is `100 * votes /
/// total_votes` (zero when nobody has voted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionResult {
    pub position: Position,
    #[serde(default)]
    pub candidates: Vec<CandidateResult>,
    #[serde(default)]
    pub total_votes: u64,
}

/// Share of `total` held by `votes`, as a percentage. Zero when `total` is 0.
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * votes as f64 / total as f64
    }
}

impl PositionResult {
    /// Recomputes the derived totals from the per-candidate vote counts. The
    /// service's own totals are not trusted to be present or consistent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.total_votes = self.candidates.iter().map(|c| c.votes).sum();
        for candidate in &mut self.candidates {
            candidate.percentage = percentage(candidate.votes, self.total_votes);
        }
        self
    }

    /// The candidate with the most votes. Ties go to whoever is listed first.
    pub fn winner(&self) -> Option<&CandidateResult> {
        self.candidates
            .iter()
            .fold(None, |best: Option<&CandidateResult>, candidate| match best {
                Some(best) if best.votes >= candidate.votes => Some(best),
                _ => Some(candidate),
            })
    }
}

/// Response body of `GET results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub success: bool,
    #[serde(default)]
    pub election_id: Option<ElectionId>,
    #[serde(default)]
    pub results: Vec<PositionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn candidate(id: u64, votes: u64) -> CandidateResult {
        CandidateResult {
            id: CandidateId::new(id),
            name: format!("Candidate {id}"),
            votes,
            percentage: 0.0,
        }
    }

    fn position_result(votes: &[u64]) -> PositionResult {
        PositionResult {
            position: Position {
                id: PositionId::new(1),
                name: "Chairperson".to_owned(),
            },
            candidates: votes
                .iter()
                .enumerate()
                .map(|(i, votes)| candidate(i as u64 + 1, *votes))
                .collect(),
            total_votes: 0,
        }
    }

    #[test]
    fn test_normalized_totals() {
        let result = position_result(&[30, 10]).normalized();
        assert_eq!(result.total_votes, 40);
        assert_eq!(result.candidates[0].percentage, 75.0);
        assert_eq!(result.candidates[1].percentage, 25.0);
    }

    #[test]
    fn test_normalized_without_votes() {
        let result = position_result(&[0, 0]).normalized();
        assert_eq!(result.total_votes, 0);
        assert!(result.candidates.iter().all(|c| c.percentage == 0.0));
    }

    #[test]
    fn test_winner_prefers_first_on_tie() {
        let result = position_result(&[5, 9, 9]);
        assert_eq!(result.winner().map(|c| c.id), Some(CandidateId::new(2)));
        assert_eq!(position_result(&[]).winner(), None);
    }

    #[test]
    fn test_deserialize_results_response() {
        let json = r#"{
            "success": true,
            "election_id": "BUSA2025",
            "results": [{
                "position": {"id": 1, "name": "Chairperson"},
                "candidates": [
                    {"id": 10, "name": "A", "votes": 3},
                    {"id": 11, "name": "B", "votes": 1}
                ],
                "total_votes": 4
            }]
        }"#;
        let response: ResultsResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.election_id, Some(ElectionId::from("BUSA2025")));
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].candidates[1].votes, 1);
        assert_eq!(response.message, None);
    }

    proptest! {
        #[test]
        fn test_normalized_invariants(votes in proptest::collection::vec(0u64..10_000, 0..8)) {
            let result = position_result(&votes).normalized();
            prop_assert_eq!(result.total_votes, votes.iter().sum::<u64>());
            for candidate in &result.candidates {
                prop_assert_eq!(
                    candidate.percentage,
                    percentage(candidate.votes, result.total_votes)
                );
            }
            if result.total_votes > 0 {
                let sum: f64 = result.candidates.iter().map(|c| c.percentage).sum();
                prop_assert!((sum - 100.0).abs() < 1e-6);
            }
        }
    }
}
