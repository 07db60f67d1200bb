use async_trait::async_trait;
use election_api_client::Client;
use election_types::results::ResultsResponse;
use election_types::status::ElectionStatus;

pub(crate) type DynElectionApi = std::sync::Arc<dyn ElectionApi>;

/// The service calls the watcher depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait ElectionApi: Send + Sync {
    async fn fetch_status(&self) -> election_api_client::Result<ElectionStatus>;
    async fn fetch_results(&self) -> election_api_client::Result<ResultsResponse>;
}

#[async_trait]
impl ElectionApi for Client {
    async fn fetch_status(&self) -> election_api_client::Result<ElectionStatus> {
        self.get_election_status().await
    }

    async fn fetch_results(&self) -> election_api_client::Result<ResultsResponse> {
        self.get_results().await
    }
}
