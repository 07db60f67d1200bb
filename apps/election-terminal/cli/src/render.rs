//! Plain-text rendering of what the terminal prints.

use std::fmt::Write;

use election_types::admin::AdminCandidates;
use election_types::display::{DisplayZone, TimeRemaining};
use election_types::results::{Position, PositionResult};
use election_types::voting::{Candidate, User, UserVotes};

use crate::phase::ResolvedPhase;
use crate::results::ValidatedResults;

/// The full status report: phase, schedule and the service's message.
pub(crate) fn status_report(phase: &ResolvedPhase, zone: &DisplayZone) -> String {
    let mut out = String::new();
    if let Some(name) = phase.name() {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(out, "Status:  {}", phase.kind().label());
    if let Some(election_id) = phase.election_id() {
        let _ = writeln!(out, "Election: {election_id}");
    }
    if !matches!(phase, ResolvedPhase::NoElection { .. }) {
        let (start_at, end_at) = phase.schedule();
        let _ = writeln!(out, "Starts:  {}", zone.format_absolute(start_at));
        let _ = writeln!(out, "Ends:    {}", zone.format_absolute(end_at));
    }
    let _ = writeln!(out, "{}", phase.describe(zone));
    if phase.is_stale() {
        let _ = writeln!(out, "(voting should have closed; waiting for the service to confirm)");
    }
    if !phase.message().is_empty() {
        let _ = writeln!(out, "{}", phase.message());
    }
    out
}

const RETRY_HINT: &str = "Run `election-terminal results` again to retry.";

/// One countdown line, e.g. `Time remaining: 1h 2m 3s`.
pub(crate) fn remaining_line(remaining: &TimeRemaining) -> String {
    if remaining.ended {
        remaining.message.clone()
    } else {
        format!("Time remaining: {}", remaining.message)
    }
}

pub(crate) fn results_report(results: &ValidatedResults, zone: &DisplayZone) -> String {
    let mut out = String::new();
    match results {
        ValidatedResults::Fresh { election_id, .. } => {
            if let Some(election_id) = election_id {
                let _ = writeln!(out, "Results for election {election_id}");
            }
        }
        ValidatedResults::Cached(set) => {
            let _ = writeln!(
                out,
                "Results for election {} (cached {})",
                set.election_id,
                zone.format_absolute(Some(set.fetched_at))
            );
            let _ = writeln!(out, "{RETRY_HINT}");
        }
        ValidatedResults::Unavailable { reason } => {
            let _ = writeln!(out, "{reason}");
            let _ = writeln!(out, "{RETRY_HINT}");
            return out;
        }
    }

    let positions = results.results().unwrap_or_default();
    if positions.is_empty() {
        let _ = writeln!(out, "No results available yet");
        return out;
    }
    for position in positions {
        out.push('\n');
        out.push_str(&position_report(position));
    }
    out
}

fn position_report(result: &PositionResult) -> String {
    let mut out = String::new();
    let winner = result.winner();
    match winner {
        Some(winner) if result.total_votes > 0 => {
            let _ = writeln!(
                out,
                "{} Winner: {} ({} votes, {:.1}%)",
                result.position.name, winner.name, winner.votes, winner.percentage
            );
        }
        _ => {
            let _ = writeln!(out, "{}", result.position.name);
        }
    }
    let _ = writeln!(out, "Total Votes: {}", result.total_votes);
    for (i, candidate) in result.candidates.iter().enumerate() {
        let badge = match winner {
            Some(winner) if winner.id == candidate.id && result.total_votes > 0 => "  Winner",
            _ => "",
        };
        let _ = writeln!(
            out,
            "  {}. {} - {} votes - {:.1}%{badge}",
            i + 1,
            candidate.name,
            candidate.votes,
            candidate.percentage
        );
    }
    out
}

pub(crate) fn user_line(user: &User) -> String {
    let name = user.display_name();
    if name == user.email {
        format!("{name} (user {})", user.id)
    } else {
        format!("{name} <{}> (user {})", user.email, user.id)
    }
}

pub(crate) fn positions_list(positions: &[Position]) -> String {
    let mut out = String::new();
    for position in positions {
        let _ = writeln!(out, "{:>4}  {}", position.id, position.name);
    }
    out
}

pub(crate) fn candidates_list(candidates: &[Candidate]) -> String {
    if candidates.is_empty() {
        return "No candidates\n".to_owned();
    }
    let mut out = String::new();
    for candidate in candidates {
        let _ = write!(out, "{:>4}  {}", candidate.id, candidate.name);
        if let Some(position) = &candidate.position_name {
            let _ = write!(out, " ({position})");
        }
        if let Some(votes) = candidate.votes {
            let _ = write!(out, " - {votes} votes");
        }
        out.push('\n');
    }
    out
}

pub(crate) fn admin_candidates(candidates: &AdminCandidates) -> String {
    let mut out = candidates_list(&candidates.candidates);
    let _ = writeln!(out, "Total Votes: {}", candidates.total_votes());
    out
}

/// Which positions the voter has voted for, and a thank-you once all are
/// done.
pub(crate) fn vote_progress(positions: &[Position], votes: &UserVotes) -> String {
    let voted = positions
        .iter()
        .filter(|position| votes.candidate_for(position.id).is_some())
        .count();

    let mut out = String::new();
    let _ = writeln!(out, "Voting Progress: {voted} of {} positions", positions.len());
    for position in positions {
        let mark = if votes.candidate_for(position.id).is_some() {
            "Voted"
        } else {
            "Not voted"
        };
        let _ = writeln!(out, "  {}: {mark}", position.name);
    }
    if !positions.is_empty() && voted == positions.len() {
        let _ = writeln!(out, "All Positions Voted!");
        let _ = writeln!(
            out,
            "Thank you for participating in the election. \
             Results will be available after the election ends."
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedResultSet;
    use crate::phase::resolve;
    use election_types::results::CandidateResult;
    use election_types::status::{ElectionId, ElectionStatus};
    use election_types::voting::{CandidateId, PositionId, UserId, VoteRecord};
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    fn position(id: u64, name: &str) -> Position {
        Position {
            id: PositionId::new(id),
            name: name.to_owned(),
        }
    }

    fn chairperson() -> PositionResult {
        PositionResult {
            position: position(1, "Chairperson"),
            candidates: vec![
                CandidateResult {
                    id: CandidateId::new(1),
                    name: "Amina".to_owned(),
                    votes: 2,
                    percentage: 0.0,
                },
                CandidateResult {
                    id: CandidateId::new(2),
                    name: "Baraka".to_owned(),
                    votes: 1,
                    percentage: 0.0,
                },
            ],
            total_votes: 0,
        }
        .normalized()
    }

    #[test]
    fn test_status_report() {
        let status = ElectionStatus {
            status: "active".to_owned(),
            election_id: Some(ElectionId::from("BUSA2025")),
            name: Some("BUSA General Election".to_owned()),
            start_at: Some(datetime!(2025-03-01 05:00:00 UTC)),
            end_at: Some(datetime!(2025-03-01 15:00:00 UTC)),
            message: "Voting is open".to_owned(),
        };
        let phase = resolve(&status, datetime!(2025-03-01 06:00:00 UTC)).unwrap();
        assert_eq!(
            status_report(&phase, &DisplayZone::default()),
            "BUSA General Election\n\
             Status:  Active\n\
             Election: BUSA2025\n\
             Starts:  March 1, 2025, 08:00 AM (UTC+03:00)\n\
             Ends:    March 1, 2025, 06:00 PM (UTC+03:00)\n\
             Election active - Ends: March 1, 2025, 06:00 PM (UTC+03:00)\n\
             Voting is open\n"
        );
    }

    #[test]
    fn test_remaining_line() {
        let remaining = TimeRemaining::from_duration(time::Duration::seconds(90));
        assert_eq!(remaining_line(&remaining), "Time remaining: 1m 30s");
        assert_eq!(remaining_line(&TimeRemaining::ended()), "Election ended");
    }

    #[test]
    fn test_results_report() {
        let results = ValidatedResults::Fresh {
            election_id: Some(ElectionId::from("42")),
            results: vec![chairperson()],
            fetched_at: datetime!(2025-03-01 05:00:00 UTC),
        };
        assert_eq!(
            results_report(&results, &DisplayZone::default()),
            "Results for election 42\n\
             \n\
             Chairperson Winner: Amina (2 votes, 66.7%)\n\
             Total Votes: 3\n  \
             1. Amina - 2 votes - 66.7%  Winner\n  \
             2. Baraka - 1 votes - 33.3%\n"
        );
    }

    #[test]
    fn test_results_report_cached() {
        let results = ValidatedResults::Cached(CachedResultSet {
            election_id: ElectionId::from("42"),
            results: vec![chairperson()],
            fetched_at: datetime!(2025-03-01 05:00:00 UTC),
        });
        let report = results_report(&results, &DisplayZone::default());
        assert!(report.starts_with(
            "Results for election 42 (cached March 1, 2025, 08:00 AM (UTC+03:00))\n\
             Run `election-terminal results` again to retry.\n"
        ));
        assert!(report.contains("Chairperson Winner: Amina"));
    }

    #[test]
    fn test_results_report_unavailable() {
        let results = ValidatedResults::Unavailable {
            reason: "Results not available yet".to_owned(),
        };
        assert_eq!(
            results_report(&results, &DisplayZone::default()),
            "Results not available yet\nRun `election-terminal results` again to retry.\n"
        );
    }

    #[test]
    fn test_position_without_votes_has_no_winner() {
        let mut result = chairperson();
        for candidate in &mut result.candidates {
            candidate.votes = 0;
        }
        let report = position_report(&result.normalized());
        assert!(report.starts_with("Chairperson\nTotal Votes: 0\n"));
        assert!(!report.contains("Winner"));
    }

    #[test]
    fn test_vote_progress() {
        let positions = vec![position(1, "Chairperson"), position(2, "Treasurer")];
        let mut votes = UserVotes {
            votes: vec![VoteRecord {
                position_id: PositionId::new(1),
                candidate_id: CandidateId::new(1),
            }],
        };
        assert_eq!(
            vote_progress(&positions, &votes),
            "Voting Progress: 1 of 2 positions\n  Chairperson: Voted\n  Treasurer: Not voted\n"
        );

        votes.votes.push(VoteRecord {
            position_id: PositionId::new(2),
            candidate_id: CandidateId::new(5),
        });
        let progress = vote_progress(&positions, &votes);
        assert!(progress.starts_with("Voting Progress: 2 of 2 positions\n"));
        assert!(progress.contains("Thank you for participating"));
    }

    #[test]
    fn test_user_line() {
        let user = User {
            id: UserId::new(7),
            email: "voter@example.com".to_owned(),
            name: None,
        };
        assert_eq!(user_line(&user), "voter@example.com (user 7)");
    }
}
