use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{QtAccountList, QtActivityList, QtAuthResponse, QtBalances, QtPositionList};

const LOGIN_URL: &str = "https://login.questrade.com/oauth2/token";

#[derive(Debug, Error)]
pub enum QuestradeApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("access token rejected")]
    Unauthorized,

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

// Raw HTTP client for the Questrade API. Token persistence and the
// refresh-and-retry policy live in the service layer.
pub struct QuestradeClient {
    client: reqwest::Client,
}

impl QuestradeClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    pub async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<QtAuthResponse, QuestradeApiError> {
        let resp = self.client
            .get(LOGIN_URL)
            .query(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| QuestradeApiError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::BAD_REQUEST
        {
            return Err(QuestradeApiError::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(QuestradeApiError::BadResponse(format!("HTTP {}", resp.status())));
        }

        resp.json::<QtAuthResponse>()
            .await
            .map_err(|e| QuestradeApiError::Parse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api_server: &str,
        access_token: &str,
        endpoint: &str,
    ) -> Result<T, QuestradeApiError> {
        // api_server comes back with a trailing slash; strip it to avoid
        // double slashes in the request path.
        let url = format!("{}/v1/{}", api_server.trim_end_matches('/'), endpoint);

        let resp = self.client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| QuestradeApiError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(QuestradeApiError::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(QuestradeApiError::BadResponse(format!("HTTP {}", resp.status())));
        }

        resp.json::<T>()
            .await
            .map_err(|e| QuestradeApiError::Parse(e.to_string()))
    }

    pub async fn get_accounts(
        &self,
        api_server: &str,
        access_token: &str,
    ) -> Result<QtAccountList, QuestradeApiError> {
        self.get(api_server, access_token, "accounts").await
    }

    pub async fn get_positions(
        &self,
        api_server: &str,
        access_token: &str,
        account_id: &str,
    ) -> Result<QtPositionList, QuestradeApiError> {
        self.get(api_server, access_token, &format!("accounts/{account_id}/positions"))
            .await
    }

    pub async fn get_balances(
        &self,
        api_server: &str,
        access_token: &str,
        account_id: &str,
    ) -> Result<QtBalances, QuestradeApiError> {
        self.get(api_server, access_token, &format!("accounts/{account_id}/balances"))
            .await
    }

    // Questrade caps the span at 31 days per request; callers chunk.
    pub async fn get_activities(
        &self,
        api_server: &str,
        access_token: &str,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<QtActivityList, QuestradeApiError> {
        let endpoint = format!(
            "accounts/{account_id}/activities?startTime={start}T00:00:00-05:00&endTime={end}T23:59:59-05:00"
        );
        self.get(api_server, access_token, &endpoint).await
    }
}
