//! Fetching results with fallback to the validated cache.

use election_types::results::PositionResult;
use election_types::status::ElectionId;
use time::OffsetDateTime;

use crate::api::ElectionApi;
use crate::cache::{CachedResultSet, Reconciliation, ResultCache};
use crate::error::Error;

pub(crate) const NOT_AVAILABLE_YET: &str = "Results not available yet";
pub(crate) const FAILED_TO_LOAD: &str = "Failed to load results. Please try again later.";

/// Results as they may be shown to the user. Never results from an election
/// other than the current one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValidatedResults {
    /// Just fetched from the service.
    Fresh {
        election_id: Option<ElectionId>,
        results: Vec<PositionResult>,
        fetched_at: OffsetDateTime,
    },
    /// The service could not provide results; these were cached earlier for
    /// the same election.
    Cached(CachedResultSet),
    /// Nothing trustworthy to show.
    Unavailable { reason: String },
}

impl ValidatedResults {
    pub(crate) fn results(&self) -> Option<&[PositionResult]> {
        match self {
            Self::Fresh { results, .. } => Some(results),
            Self::Cached(set) => Some(&set.results),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Fetches results for the `observed` election.
///
/// Fresh results replace the cache. When the fetch fails, or the service is
/// not publishing results, the cache is used only if it belongs to `observed`.
pub(crate) async fn validated_results(
    api: &dyn ElectionApi,
    cache: &ResultCache,
    observed: Option<&ElectionId>,
    now: OffsetDateTime,
) -> ValidatedResults {
    let reason = match api.fetch_results().await {
        Ok(response) if response.success => {
            let election_id = response.election_id.or_else(|| observed.cloned());
            let results: Vec<_> = response
                .results
                .into_iter()
                .map(PositionResult::normalized)
                .collect();

            match &election_id {
                Some(election_id) => {
                    let set = CachedResultSet {
                        election_id: election_id.clone(),
                        results: results.clone(),
                        fetched_at: now,
                    };
                    if let Err(e) = cache.store_fresh(&set) {
                        tracing::warn!("failed to cache results: {e}");
                    }
                }
                None => tracing::debug!("results carry no election id; not caching them"),
            }

            return ValidatedResults::Fresh {
                election_id,
                results,
                fetched_at: now,
            };
        }
        Ok(response) => response
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE_YET.to_owned()),
        Err(e) => {
            let error = Error::from(e);
            tracing::warn!("failed to fetch results: {error}");
            FAILED_TO_LOAD.to_owned()
        }
    };

    match cached_for(cache, observed) {
        Some(set) => ValidatedResults::Cached(set),
        None => ValidatedResults::Unavailable { reason },
    }
}

fn cached_for(cache: &ResultCache, observed: Option<&ElectionId>) -> Option<CachedResultSet> {
    let reconciled = cache
        .load()
        .and_then(|cached| cache.reconcile(observed, cached));
    match reconciled {
        Ok(Reconciliation { valid, evicted }) => {
            if evicted {
                tracing::info!("cached results belonged to another election");
            }
            valid
        }
        Err(e) => {
            tracing::warn!("failed to read cached results: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockElectionApi;
    use crate::error::testing::{malformed_response, network_failure};
    use crate::store::{MemoryStore, SharedStore};
    use election_types::results::{CandidateResult, Position, ResultsResponse};
    use election_types::voting::{CandidateId, PositionId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-03-01 05:00:00 UTC);

    fn cache() -> ResultCache {
        let store: SharedStore = Arc::new(MemoryStore::new());
        ResultCache::new(store)
    }

    fn chairperson(votes: &[u64]) -> PositionResult {
        PositionResult {
            position: Position {
                id: PositionId::new(1),
                name: "Chairperson".to_owned(),
            },
            candidates: votes
                .iter()
                .enumerate()
                .map(|(i, votes)| CandidateResult {
                    id: CandidateId::new(i as u64 + 1),
                    name: format!("Candidate {}", i + 1),
                    votes: *votes,
                    percentage: 0.0,
                })
                .collect(),
            total_votes: 0,
        }
    }

    fn api_returning(response: ResultsResponse) -> MockElectionApi {
        let mut api = MockElectionApi::new();
        api.expect_fetch_results()
            .times(1)
            .return_once(move || Ok(response));
        api
    }

    fn failing_api(error: fn() -> election_api_client::Error) -> MockElectionApi {
        let mut api = MockElectionApi::new();
        api.expect_fetch_results()
            .times(1)
            .returning(move || Err(error()));
        api
    }

    fn cached(cache: &ResultCache, election_id: &str) -> CachedResultSet {
        let set = CachedResultSet {
            election_id: ElectionId::from(election_id),
            results: vec![chairperson(&[3, 1]).normalized()],
            fetched_at: NOW - time::Duration::hours(1),
        };
        cache.store_fresh(&set).unwrap();
        set
    }

    #[tokio::test]
    async fn test_fresh_results_are_normalized_and_cached() {
        let cache = cache();
        let api = api_returning(ResultsResponse {
            success: true,
            election_id: Some(ElectionId::from(42)),
            results: vec![chairperson(&[30, 10])],
            message: None,
        });

        let validated = validated_results(&api, &cache, None, NOW).await;
        let ValidatedResults::Fresh {
            election_id,
            results,
            ..
        } = &validated
        else {
            panic!("expected fresh results, got {validated:?}");
        };
        assert_eq!(*election_id, Some(ElectionId::from("42")));
        assert_eq!(results[0].total_votes, 40);
        assert_eq!(results[0].candidates[0].percentage, 75.0);

        let stored = cache.load().unwrap().unwrap();
        assert_eq!(stored.election_id, ElectionId::from("42"));
        assert_eq!(stored.results, *results);
    }

    #[tokio::test]
    async fn test_fresh_results_without_id_use_observed() {
        let cache = cache();
        let api = api_returning(ResultsResponse {
            success: true,
            election_id: None,
            results: vec![chairperson(&[1])],
            message: None,
        });

        let observed = ElectionId::from("BUSA2025");
        validated_results(&api, &cache, Some(&observed), NOW).await;
        assert_eq!(cache.load().unwrap().unwrap().election_id, observed);
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_matching_cache() {
        let cache = cache();
        let set = cached(&cache, "E1");
        let api = failing_api(network_failure);

        let validated =
            validated_results(&api, &cache, Some(&ElectionId::from("E1")), NOW).await;
        assert_eq!(validated, ValidatedResults::Cached(set));
    }

    #[tokio::test]
    async fn test_failed_fetch_never_shows_other_election() {
        let cache = cache();
        cached(&cache, "E1");
        let api = failing_api(malformed_response);

        let validated =
            validated_results(&api, &cache, Some(&ElectionId::from("E2")), NOW).await;
        assert_eq!(
            validated,
            ValidatedResults::Unavailable {
                reason: FAILED_TO_LOAD.to_owned()
            }
        );
        assert_eq!(cache.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unpublished_results() {
        let cache = cache();
        let api = api_returning(ResultsResponse {
            success: false,
            election_id: None,
            results: Vec::new(),
            message: None,
        });

        let validated = validated_results(&api, &cache, None, NOW).await;
        assert_eq!(
            validated,
            ValidatedResults::Unavailable {
                reason: NOT_AVAILABLE_YET.to_owned()
            }
        );
        assert_eq!(validated.results(), None);
    }

    #[tokio::test]
    async fn test_unpublished_results_keep_service_message() {
        let cache = cache();
        let api = api_returning(ResultsResponse {
            success: false,
            election_id: None,
            results: Vec::new(),
            message: Some("Results will be published after voting closes".to_owned()),
        });

        let validated = validated_results(&api, &cache, None, NOW).await;
        assert_eq!(
            validated,
            ValidatedResults::Unavailable {
                reason: "Results will be published after voting closes".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_election_keeps_cache() {
        let cache = cache();
        let set = cached(&cache, "E1");
        let api = failing_api(network_failure);

        let validated = validated_results(&api, &cache, None, NOW).await;
        assert_eq!(validated.results(), Some(set.results.as_slice()));
    }
}
