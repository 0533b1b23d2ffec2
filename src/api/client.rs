//! HTTP fetch client for the lottery results service.
//!
//! The repository consumes the [`FetchClient`] trait so the transport can
//! be replaced in tests; [`LotteryApiClient`] is the production
//! implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::dto::{DrawPayload, Envelope};
use crate::api::ApiError;
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Full request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The three fetch shapes the repository drives.
///
/// Network and timeout failures surface as [`ApiError::Transport`];
/// application-level failures stay inside the returned [`Envelope`].
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch_latest(&self, code: &str) -> Result<Envelope<DrawPayload>, ApiError>;

    async fn fetch_by_issue(
        &self,
        issue: &str,
        code: &str,
    ) -> Result<Envelope<DrawPayload>, ApiError>;

    async fn fetch_history(
        &self,
        code: &str,
        size: u32,
    ) -> Result<Envelope<Vec<DrawPayload>>, ApiError>;
}

/// API client for the lottery results service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct LotteryApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LotteryApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope<T>, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(endpoint, %status, "lottery API response received");

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl FetchClient for LotteryApiClient {
    async fn fetch_latest(&self, code: &str) -> Result<Envelope<DrawPayload>, ApiError> {
        self.get_envelope("kjxx", &[("code", code)]).await
    }

    async fn fetch_by_issue(
        &self,
        issue: &str,
        code: &str,
    ) -> Result<Envelope<DrawPayload>, ApiError> {
        self.get_envelope("issue", &[("issue", issue), ("code", code)])
            .await
    }

    async fn fetch_history(
        &self,
        code: &str,
        size: u32,
    ) -> Result<Envelope<Vec<DrawPayload>>, ApiError> {
        let size = size.to_string();
        self.get_envelope("history", &[("code", code), ("size", size.as_str())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> Config {
        Config {
            base_url,
            api_key: "test-key".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_latest_decodes_envelope() {
        let server = MockServer::start().await;
        let body = r#"{
            "code": 1,
            "msg": "",
            "time": "2024-06-09 21:30:00",
            "data": {
                "type": "福彩", "name": "双色球", "code": "ssq", "issue": "2024066",
                "red": "03 07 11 18 24 30", "blue": "12",
                "drawdate": "2024-06-09", "time_rule": "每周二四日21:15"
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/kjxx"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("code", "ssq"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = LotteryApiClient::new(&test_config(format!("{}/", server.uri()))).unwrap();
        let envelope = client.fetch_latest("ssq").await.unwrap();
        let payload = envelope.into_payload().unwrap();
        assert_eq!(payload.issue, "2024066");
        assert_eq!(payload.red, "03 07 11 18 24 30");
    }

    #[tokio::test]
    async fn test_fetch_history_passes_size() {
        let server = MockServer::start().await;
        let body = r#"{ "code": 1, "msg": "", "time": "", "data": [] }"#;
        Mock::given(method("GET"))
            .and(path("/history"))
            .and(query_param("code", "pl5"))
            .and(query_param("size", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = LotteryApiClient::new(&test_config(format!("{}/", server.uri()))).unwrap();
        let envelope = client.fetch_history("pl5", 50).await.unwrap();
        assert!(envelope.into_payload().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_class() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kjxx"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = LotteryApiClient::new(&test_config(format!("{}/", server.uri()))).unwrap();
        match client.fetch_latest("ssq").await {
            Err(ApiError::Http { status, body }) => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issue"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = LotteryApiClient::new(&test_config(format!("{}/", server.uri()))).unwrap();
        assert!(matches!(
            client.fetch_by_issue("2024001", "ssq").await,
            Err(ApiError::Decode(_))
        ));
    }
}
