use crate::clients::base::JsonFetcher;
use crate::config::Config;
use crate::errors::{DataHubError, Result};
use crate::models::outcome::FetchOutcome;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Financial Modeling Prep REST 客户端
pub struct FmpClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_delay: Duration,
}

impl FmpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(DataHubError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: config.api_key().to_string(),
            request_delay: config.request_delay(),
        })
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        let text = response.text().await?;
        let json: Value = serde_json::from_str(&text)?;
        Ok(Some(json))
    }
}

#[async_trait]
impl JsonFetcher for FmpClient {
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> FetchOutcome {
        let outcome = match self.request(endpoint, params).await {
            Ok(Some(json)) => FetchOutcome::Json(json),
            Ok(None) => {
                debug!("{} returned 403, not available on this plan", endpoint);
                FetchOutcome::Forbidden
            }
            Err(e) => {
                error!("Error fetching {}: {}", endpoint, e);
                FetchOutcome::Failed(e.to_string())
            }
        };

        // 限制请求频率，无论成功与否
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        outcome
    }
}
