use std::time::Duration;

use election_types::admin::{
    AddCandidateRequest, AdjustVotesRequest, AdjustVotesResponse, AdminCandidates,
    AdminCredentials, AdminLoginRequest, CreateUserRequest, DeleteCandidateRequest,
    SetElectionRequest,
};
use election_types::results::{Position, ResultsResponse};
use election_types::status::ElectionStatus;
use election_types::voting::{
    ActionResponse, Candidate, CastVoteRequest, PositionId, SigninRequest, SigninResponse, UserId,
    UserVotes,
};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::result::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A client for the election service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client with the given base URL. All endpoint paths are
    /// resolved relative to it, so a base of `https://example.com/api` calls
    /// `https://example.com/api/election/status`.
    ///
    /// # Example
    ///
    /// ```
    /// # use election_api_client::Client;
    /// let base_url = "http://localhost:5000/api".parse().unwrap();
    /// let client = Client::new(base_url);
    /// assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/");
    /// ```
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Create a new client to connect to a service running on localhost.
    pub fn localhost() -> Self {
        Self::new(
            "http://localhost:5000/api/"
                .parse()
                .expect("hardcoded URL is valid"),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the current election status.
    ///
    /// # Example
    ///
    /// ```
    /// # use election_api_client::Client;
    /// # async {
    /// # let client = Client::localhost();
    /// let status = client.get_election_status().await.unwrap();
    /// println!("{}: {}", status.status, status.message);
    /// # };
    /// ```
    pub async fn get_election_status(&self) -> Result<ElectionStatus> {
        self.get_json("election/status", "failed to get election status")
            .await
    }

    /// Get the current results. A response with `success == false` means the
    /// service is not publishing results yet; it is not an error.
    pub async fn get_results(&self) -> Result<ResultsResponse> {
        let url = self.url("results")?;
        tracing::debug!("GET {url}");
        let response = self.send(self.http.get(url)).await?;
        decode(response, "failed to get results", Refusals::UseEnvelope).await
    }

    pub async fn get_user_votes(&self, user_id: UserId) -> Result<UserVotes> {
        self.get_json(
            &format!("user/{user_id}/votes"),
            &format!("failed to get votes for user {user_id}"),
        )
        .await
    }

    pub async fn cast_vote(&self, request: &CastVoteRequest) -> Result<ActionResponse> {
        self.post_json(
            "vote",
            request,
            &format!(
                "failed to cast vote for candidate {} in position {}",
                request.candidate_id, request.position_id
            ),
        )
        .await
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<SigninResponse> {
        let request = SigninRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.post_json("user/signin", &request, &format!("failed to sign in {email}"))
            .await
    }

    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        self.get_json("positions", "failed to get positions").await
    }

    /// Get the candidates standing for a position. `admin` asks the service to
    /// include administrative fields such as vote counts.
    pub async fn get_position_candidates(
        &self,
        position_id: PositionId,
        admin: bool,
    ) -> Result<Vec<Candidate>> {
        let path = format!("positions/{position_id}/candidates");
        let context = format!("failed to get candidates for position {position_id}");
        let mut url = self.url(&path)?;
        if admin {
            url.query_pairs_mut().append_pair("admin", "true");
        }
        let response = self.send(self.http.get(url)).await?;
        decode(response, &context, Refusals::AreErrors).await
    }

    pub async fn admin_login(&self, credentials: &AdminCredentials) -> Result<ActionResponse> {
        self.post_json(
            "admin/login",
            &AdminLoginRequest::from(credentials),
            "failed to log in as admin",
        )
        .await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<ActionResponse> {
        self.post_json(
            "admin/create_user",
            request,
            &format!("failed to create user {}", request.email),
        )
        .await
    }

    pub async fn add_candidate(&self, request: &AddCandidateRequest) -> Result<ActionResponse> {
        self.post_json(
            "admin/add_candidate",
            request,
            &format!(
                "failed to add candidate {} to position {}",
                request.name, request.position_id
            ),
        )
        .await
    }

    pub async fn delete_candidate(
        &self,
        request: &DeleteCandidateRequest,
    ) -> Result<ActionResponse> {
        self.post_json(
            "admin/delete_candidate",
            request,
            &format!("failed to delete candidate {}", request.candidate_id),
        )
        .await
    }

    pub async fn adjust_votes(&self, request: &AdjustVotesRequest) -> Result<AdjustVotesResponse> {
        self.post_json(
            "admin/adjust_votes",
            request,
            &format!("failed to adjust votes for candidate {}", request.candidate_id),
        )
        .await
    }

    pub async fn set_election(&self, request: &SetElectionRequest) -> Result<ActionResponse> {
        self.post_json(
            "admin/set_election",
            request,
            &format!("failed to set election {:?}", request.name),
        )
        .await
    }

    pub async fn get_admin_candidates(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<AdminCandidates> {
        let mut url = self.url("admin/candidates")?;
        url.query_pairs_mut()
            .append_pair("admin_name", &credentials.admin_name)
            .append_pair("admin_password", &credentials.admin_password);
        let response = self.send(self.http.get(url)).await?;
        decode(response, "failed to get admin candidate list", Refusals::AreErrors).await
    }

    fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with(self.base_url.as_str()) {
            Ok(Url::parse(path)?)
        } else {
            Ok(self.base_url.join(path.trim_start_matches('/'))?)
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        Ok(request.timeout(REQUEST_TIMEOUT).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("GET {url}");
        let response = self.send(self.http.get(url)).await?;
        decode(response, context, Refusals::AreErrors).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
        context: &str,
    ) -> Result<T> {
        let url = self.url(path)?;
        tracing::debug!("POST {url}");
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response, context, Refusals::UseEnvelope).await
    }
}

/// How an endpoint reports a refused request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusals {
    /// Any non-2xx response is an HTTP error, whatever its body. Data
    /// endpoints such as `election/status` have no refusal envelope, and an
    /// error page that happens to parse must not pass for data.
    AreErrors,
    /// Refusals (wrong password, voting closed, results not published) come
    /// with a non-2xx status and the endpoint's usual `{success, message}`
    /// envelope, so a parseable body is returned regardless of status. Only a
    /// non-2xx response without one is an HTTP error.
    UseEnvelope,
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
    refusals: Refusals,
) -> Result<T> {
    let status_code = response.status();
    let text = response.text().await?;
    decode_body(status_code, text, context, refusals)
}

fn decode_body<T: DeserializeOwned>(
    status_code: StatusCode,
    text: String,
    context: &str,
    refusals: Refusals,
) -> Result<T> {
    if !status_code.is_success() && refusals == Refusals::AreErrors {
        return Err(Error::Http {
            status_code,
            text,
            context: context.to_owned(),
        });
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) if !status_code.is_success() => Err(Error::Http {
            status_code,
            text,
            context: context.to_owned(),
        }),
        Err(source) => Err(Error::Json {
            source,
            context: context.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = Client::new("https://example.com/api".parse().unwrap());
        assert_eq!(client.base_url().as_str(), "https://example.com/api/");
        assert_eq!(
            client.url("election/status").unwrap().as_str(),
            "https://example.com/api/election/status"
        );
        assert_eq!(
            client.url("/results").unwrap().as_str(),
            "https://example.com/api/results"
        );
    }

    #[test]
    fn test_absolute_url_is_kept() {
        let client = Client::new("https://example.com/api/".parse().unwrap());
        assert_eq!(
            client
                .url("https://example.com/api/user/3/votes")
                .unwrap()
                .as_str(),
            "https://example.com/api/user/3/votes"
        );
    }

    #[test]
    fn test_decode_success() {
        let response: ActionResponse =
            decode_body(
                StatusCode::OK,
                r#"{"success": true}"#.to_owned(),
                "vote",
                Refusals::UseEnvelope,
            )
            .unwrap();
        assert_eq!(
            response,
            ActionResponse {
                success: true,
                message: None
            }
        );
    }

    #[test]
    fn test_decode_refusal_with_body() {
        let response: ActionResponse = decode_body(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "message": "Already voted"}"#.to_owned(),
            "vote",
            Refusals::UseEnvelope,
        )
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.message_or("Failed"), "Already voted");
    }

    #[test]
    fn test_decode_http_error() {
        let error = decode_body::<ActionResponse>(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>".to_owned(),
            "vote",
            Refusals::UseEnvelope,
        )
        .unwrap_err();
        assert!(matches!(error, Error::Http { status_code, .. } if status_code == StatusCode::BAD_GATEWAY));
        assert_eq!(error.kind(), ErrorKind::NetworkFailure);
    }

    #[test]
    fn test_decode_malformed() {
        let error = decode_body::<ElectionStatus>(
            StatusCode::OK,
            r#"{"state": "active"}"#.to_owned(),
            "status",
            Refusals::AreErrors,
        )
        .unwrap_err();
        assert!(matches!(error, Error::Json { .. }));
        assert_eq!(error.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_decode_status_error_page_that_parses() {
        // `status` is a free-form string, so this body is a valid
        // ElectionStatus; the 503 must still win
        let body = r#"{"status": "error", "message": "Database unavailable"}"#;
        let error = decode_body::<ElectionStatus>(
            StatusCode::SERVICE_UNAVAILABLE,
            body.to_owned(),
            "failed to get election status",
            Refusals::AreErrors,
        )
        .unwrap_err();
        assert!(matches!(
            &error,
            Error::Http { status_code, text, .. }
                if *status_code == StatusCode::SERVICE_UNAVAILABLE && text == body
        ));
        assert_eq!(error.kind(), ErrorKind::NetworkFailure);

        let status: ElectionStatus = decode_body(
            StatusCode::OK,
            body.to_owned(),
            "failed to get election status",
            Refusals::AreErrors,
        )
        .unwrap();
        assert_eq!(status.status, "error");
    }

    #[test]
    fn test_decode_unpublished_results_envelope() {
        let response: ResultsResponse = decode_body(
            StatusCode::NOT_FOUND,
            r#"{"success": false, "message": "Results are not published"}"#.to_owned(),
            "failed to get results",
            Refusals::UseEnvelope,
        )
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Results are not published"));
    }
}
