//! HTTP client for the Spender REST API.
//!
//! [`SpenderClient`] speaks the wire protocol only: it builds URLs,
//! sends JSON, and maps status codes to [`SpenderError`]. Scope
//! tracking and local state live in [`crate::store`] and
//! [`crate::aggregator`], which reach the client through the
//! [`Backend`] trait.

use core::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::backend::Backend;
use crate::error::{Result, SpenderError};
use crate::models::{
    AuthRequest, DashboardResponse, NewTransaction, Period, Transaction, TransactionId,
    TransactionPatch, User, UserId,
};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Transactions collection path.
const TRANSACTIONS_PATH: &str = "/api/transactions";

/// Dashboard aggregation path.
const DASHBOARD_PATH: &str = "/api/dashboard";

/// Auth exchange path.
const AUTH_PATH: &str = "/auth/google";

/// Builder for constructing a [`SpenderClient`].
#[derive(Debug)]
pub struct SpenderClientBuilder {
    /// Base URL override.
    base_url: Option<String>,
    /// Per-request timeout.
    timeout: Option<Duration>,
}

impl SpenderClientBuilder {
    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets a per-request timeout. Timed-out requests fail like any
    /// other transport error and are not retried.
    #[inline]
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::InvalidBaseUrl`] if the base URL does not parse.
    /// Returns [`SpenderError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<SpenderClient> {
        let raw = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = Url::parse(raw.trim_end_matches('/'))?;
        tracing::debug!(base_url = %base_url, "building client");

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(SpenderClient {
            http: http.build()?,
            base_url,
        })
    }
}

/// Async client for the Spender API.
///
/// Use [`SpenderClient::builder()`] to construct an instance. Data
/// endpoints are exposed through the [`Backend`] implementation.
#[derive(Debug, Clone)]
pub struct SpenderClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// API base URL, without trailing slash.
    base_url: Url,
}

impl SpenderClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> SpenderClientBuilder {
        SpenderClientBuilder {
            base_url: None,
            timeout: None,
        }
    }

    /// Returns the configured base URL.
    #[inline]
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchanges an OAuth access token for a Spender user via
    /// `POST /auth/google`.
    ///
    /// # Errors
    ///
    /// Returns [`SpenderError::Auth`] if the server rejects the token,
    /// or a transport error if the request fails.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<User> {
        let url = self.endpoint(AUTH_PATH, &[])?;
        self.send(Method::POST, url, Some(request)).await
    }

    /// Builds a full URL for `path` with the given query pairs.
    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url.as_str().trim_end_matches('/')))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                let _serializer = pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Builds the `user_id` / `month` query for a scoped request.
    fn scoped_query(user: UserId, period: Option<Period>) -> Vec<(&'static str, String)> {
        let mut query = vec![("user_id", user.to_string())];
        if let Some(period) = period {
            query.push(("month", period.to_string()));
        }
        query
    }

    /// Sends a request with an optional JSON body and deserializes the
    /// JSON response.
    #[tracing::instrument(skip_all, fields(method = %method, path = %url.path()))]
    async fn send<Req: serde::Serialize + Sync, Resp: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Req>,
    ) -> Result<Resp> {
        let response = self.dispatch(method, url, body).await?;
        let text = response.text().await?;
        tracing::trace!(body_len = text.len(), "parsing response body");
        serde_json::from_str(&text).map_err(SpenderError::from)
    }

    /// Sends a request and checks the status, returning the raw response.
    async fn dispatch<Req: serde::Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Req>,
    ) -> Result<reqwest::Response> {
        tracing::trace!(url = %url, "sending request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }
        let response = request.send().await?;
        Self::check_status(response).await
    }

    /// Maps non-success statuses to errors.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_err| "unknown error".to_owned());
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(message = %message, "request rejected as unauthenticated");
            return Err(SpenderError::Auth { message });
        }
        tracing::debug!(status = status.as_u16(), message = %message, "API error");
        Err(SpenderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl Backend for SpenderClient {
    async fn list_transactions(&self, user: UserId, period: Period) -> Result<Vec<Transaction>> {
        let url = self.endpoint(TRANSACTIONS_PATH, &Self::scoped_query(user, Some(period)))?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    async fn create_transaction(&self, user: UserId, body: &NewTransaction) -> Result<Transaction> {
        let url = self.endpoint(TRANSACTIONS_PATH, &Self::scoped_query(user, None))?;
        self.send(Method::POST, url, Some(body)).await
    }

    async fn update_transaction(
        &self,
        user: UserId,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction> {
        let path = format!("{TRANSACTIONS_PATH}/{id}");
        let url = self.endpoint(&path, &Self::scoped_query(user, None))?;
        self.send(Method::PATCH, url, Some(patch)).await
    }

    async fn delete_transaction(&self, user: UserId, id: TransactionId) -> Result<()> {
        let path = format!("{TRANSACTIONS_PATH}/{id}");
        let url = self.endpoint(&path, &Self::scoped_query(user, None))?;
        // The acknowledgement body, if any, carries nothing we need.
        let _response = self.dispatch::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn dashboard(&self, user: UserId, period: Period) -> Result<DashboardResponse> {
        let url = self.endpoint(DASHBOARD_PATH, &Self::scoped_query(user, Some(period)))?;
        self.send::<(), _>(Method::GET, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SpenderClient {
        SpenderClient::builder().base_url(server.uri()).build().unwrap()
    }

    fn march() -> Period {
        Period::new(2025, 3).unwrap()
    }

    #[test]
    fn builder_defaults_to_localhost() {
        let client = SpenderClient::builder().build().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn builder_rejects_garbage_url() {
        let result = SpenderClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(SpenderError::InvalidBaseUrl(_))));
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_query() {
        let client = SpenderClient::builder()
            .base_url("http://api.example.com/spender/")
            .build()
            .unwrap();
        let url = client
            .endpoint(
                TRANSACTIONS_PATH,
                &SpenderClient::scoped_query(UserId::new(4), Some(march())),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.example.com/spender/api/transactions?user_id=4&month=2025-03"
        );
    }

    #[tokio::test]
    async fn list_transactions_sends_scope_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/transactions"))
            .and(query_param("user_id", "7"))
            .and(query_param("month", "2025-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 2, "user_id": 7, "name": "Rent", "amount": 900.0, "category": "Bills", "date": "2025-03-01"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .list_transactions(UserId::new(7), march())
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].category, Category::Bills);
    }

    #[tokio::test]
    async fn create_transaction_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/transactions"))
            .and(query_param("user_id", "7"))
            .and(body_json(serde_json::json!({
                "name": "Coffee", "amount": 4.5, "category": "Eating Out", "date": "2025-03-02"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(
                {"id": 31, "user_id": 7, "name": "Coffee", "amount": 4.5, "category": "Eating Out", "date": "2025-03-02"}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let body = NewTransaction {
            name: "Coffee".to_owned(),
            amount: 4.5,
            category: Category::EatingOut,
            date: march().first_day().unwrap().succ_opt().unwrap(),
        };
        let created = client_for(&server)
            .create_transaction(UserId::new(7), &body)
            .await
            .unwrap();
        assert_eq!(created.id, TransactionId::new(31));
    }

    #[tokio::test]
    async fn update_transaction_patches_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/transactions/31"))
            .and(query_param("user_id", "7"))
            .and(body_json(serde_json::json!({"amount": 5.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(
                {"id": 31, "name": "Coffee", "amount": 5.0, "category": "Eating Out", "date": "2025-03-02"}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let patch = TransactionPatch {
            amount: Some(5.0),
            ..TransactionPatch::default()
        };
        let updated = client_for(&server)
            .update_transaction(UserId::new(7), TransactionId::new(31), &patch)
            .await
            .unwrap();
        assert!((updated.amount - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/transactions/31"))
            .and(query_param("user_id", "7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_transaction(UserId::new(7), TransactionId::new(31))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dashboard_parses_breakdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .and(query_param("month", "2025-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_spent": 4.5,
                "category_breakdown": [{"category": "Eating Out", "amount": 4.5}]
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .dashboard(UserId::new(7), march())
            .await
            .unwrap();
        assert_eq!(resp.category_breakdown.len(), 1);
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_transactions(UserId::new(1), march())
            .await
            .unwrap_err();
        assert!(matches!(err, SpenderError::Api { status: 500, ref message } if message == "db down"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .authenticate(&AuthRequest::new("bad", serde_json::Value::Null))
            .await
            .unwrap_err();
        assert!(err.requires_login());
    }

    #[tokio::test]
    async fn authenticate_returns_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google"))
            .and(body_json(serde_json::json!({"token": "tok", "user_info": {"sub": "g-1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(
                {"id": 7, "email": "ada@example.com", "name": "Ada", "picture": "http://pic"}
            )))
            .mount(&server)
            .await;

        let user = client_for(&server)
            .authenticate(&AuthRequest::new("tok", serde_json::json!({"sub": "g-1"})))
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new(7));
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .dashboard(UserId::new(1), march())
            .await
            .unwrap_err();
        assert!(matches!(err, SpenderError::Serialization(_)));
    }
}
