//! Persisted results cache, keyed to the election that produced it.
//!
//! Cached results are only ever shown for the election they came from. When
//! the terminal sees a different election than the one recorded, the cache
//! is evicted rather than risk showing last year's winners.

use election_types::results::PositionResult;
use election_types::status::ElectionId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{Result, SharedStore, StoreExt};

pub(crate) const CURRENT_ELECTION_ID_KEY: &str = "current_election_id";
pub(crate) const ELECTION_RESULTS_KEY: &str = "election_results";

/// Layout version of the persisted results. Bump when [`CachedResultSet`]
/// changes shape; older values are then discarded on load.
pub(crate) const CACHE_VERSION: u32 = 1;

/// The last results fetched successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CachedResultSet {
    pub(crate) election_id: ElectionId,
    pub(crate) results: Vec<PositionResult>,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) fetched_at: OffsetDateTime,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    set: CachedResultSet,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reconciliation {
    /// The cached results, if they may be shown.
    pub(crate) valid: Option<CachedResultSet>,
    /// Whether the persisted cache was deleted.
    pub(crate) evicted: bool,
}

#[derive(Clone)]
pub(crate) struct ResultCache {
    store: SharedStore,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").finish_non_exhaustive()
    }
}

impl ResultCache {
    pub(crate) fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Reads the persisted results. A value written by another layout
    /// version, or one that cannot be read at all, is removed and reported
    /// as absent.
    pub(crate) fn load(&self) -> Result<Option<CachedResultSet>> {
        let Some(value) = self.store.get(ELECTION_RESULTS_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_value::<Envelope>(value) {
            Ok(Envelope { version, set }) if version == CACHE_VERSION => Ok(Some(set)),
            Ok(Envelope { version, .. }) => {
                tracing::info!("discarding results cached with layout version {version}");
                self.store.remove(ELECTION_RESULTS_KEY)?;
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("discarding unreadable cached results: {error}");
                self.store.remove(ELECTION_RESULTS_KEY)?;
                Ok(None)
            }
        }
    }

    /// Decides whether `cached` may be shown for the `observed` election.
    ///
    /// Results from another election are deleted from the store. When the
    /// current election is unknown nothing is deleted: an outage must not
    /// destroy a valid cache.
    pub(crate) fn reconcile(
        &self,
        observed: Option<&ElectionId>,
        cached: Option<CachedResultSet>,
    ) -> Result<Reconciliation> {
        let Some(cached) = cached else {
            return Ok(Reconciliation {
                valid: None,
                evicted: false,
            });
        };

        match observed {
            Some(observed) if *observed != cached.election_id => {
                tracing::info!(
                    "evicting results cached for election {} (current election is {observed})",
                    cached.election_id
                );
                self.evict()?;
                Ok(Reconciliation {
                    valid: None,
                    evicted: true,
                })
            }
            _ => Ok(Reconciliation {
                valid: Some(cached),
                evicted: false,
            }),
        }
    }

    /// Replaces the cache with freshly fetched results and records their
    /// election as the current one.
    pub(crate) fn store_fresh(&self, set: &CachedResultSet) -> Result<()> {
        self.store.set_json(
            ELECTION_RESULTS_KEY,
            &Envelope {
                version: CACHE_VERSION,
                set: set.clone(),
            },
        )?;
        self.store
            .set_json(CURRENT_ELECTION_ID_KEY, &set.election_id)
    }

    /// Records `election_id` as seen on a status poll. A change of election
    /// evicts the cache; returns whether it did.
    pub(crate) fn observe(&self, election_id: &ElectionId) -> Result<bool> {
        let recorded = self.recorded_election_id()?;
        if recorded.as_ref() == Some(election_id) {
            return Ok(false);
        }

        let cached = self.load()?;
        let Reconciliation { evicted, .. } = self.reconcile(Some(election_id), cached)?;
        self.store.set_json(CURRENT_ELECTION_ID_KEY, election_id)?;
        if recorded.is_some() {
            tracing::info!("new election detected: {election_id}");
        }
        Ok(evicted)
    }

    pub(crate) fn recorded_election_id(&self) -> Result<Option<ElectionId>> {
        self.store.get_json(CURRENT_ELECTION_ID_KEY)
    }

    pub(crate) fn evict(&self) -> Result<()> {
        self.store.remove(ELECTION_RESULTS_KEY)
    }

    /// Forgets both the results and the recorded election.
    pub(crate) fn clear(&self) -> Result<()> {
        self.store.remove(ELECTION_RESULTS_KEY)?;
        self.store.remove(CURRENT_ELECTION_ID_KEY)
    }
}
