//! Strava v3 API transport

use async_trait::async_trait;

use crate::error::{FetcherError, FetcherResult};
use crate::traits::ActivityTransport;
use crate::types::{FetcherConfig, LogicalQuery};
use shared::{StatusClass, TransportFailure};

/// Stream types requested for every activity
const STREAM_KEYS: &str = "latlng,altitude,velocity_smooth,time";

/// Real transport issuing requests against the Strava v3 API
pub struct StravaTransport {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl StravaTransport {
    pub fn new(config: &FetcherConfig) -> FetcherResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetcherError::ConfigError {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn url_and_params(&self, query: &LogicalQuery) -> (String, Vec<(String, String)>) {
        match query {
            LogicalQuery::ActivityPage {
                per_page,
                page,
                after_epoch_s,
            } => {
                let mut params = vec![
                    ("per_page".to_string(), per_page.to_string()),
                    ("page".to_string(), page.to_string()),
                ];
                if let Some(after) = after_epoch_s {
                    params.push(("after".to_string(), after.to_string()));
                }
                (format!("{}/athlete/activities", self.base_url), params)
            }
            LogicalQuery::ActivityStreams { activity_id } => (
                format!("{}/activities/{}/streams", self.base_url, activity_id),
                vec![
                    ("keys".to_string(), STREAM_KEYS.to_string()),
                    ("key_by_type".to_string(), "true".to_string()),
                ],
            ),
        }
    }
}

#[async_trait]
impl ActivityTransport for StravaTransport {
    async fn issue_request(
        &self,
        query: &LogicalQuery,
    ) -> Result<serde_json::Value, TransportFailure> {
        let (url, params) = self.url_and_params(query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| TransportFailure::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        match StatusClass::from_code(status) {
            StatusClass::Success => response
                .json()
                .await
                .map_err(|e| TransportFailure::MalformedPayload(e.to_string())),
            StatusClass::Throttled => Err(TransportFailure::RateLimitExceeded),
            StatusClass::Transient => Err(TransportFailure::ServerError(status)),
            StatusClass::Permanent => Err(TransportFailure::RequestRejected(status)),
        }
    }
}
