//! Client for the platform's backend REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::classes::ClassRecord;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `detail` if it is a string, then `error`, then a generic status message.
pub fn error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    [parsed.detail, parsed.error]
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("API error {status}"))
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "backend request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        Ok(response.json().await?)
    }

    pub async fn fetch_classes(&self, school_id: i64) -> Result<Vec<ClassRecord>, BackendError> {
        self.get(&format!("/getclasses?school_id={school_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_detail_string() {
        assert_eq!(
            error_message(404, r#"{"detail":"Class not found"}"#),
            "Class not found"
        );
        assert_eq!(
            error_message(400, r#"{"detail":[{"loc":["query"]}],"error":"Bad school id"}"#),
            "Bad school id"
        );
        assert_eq!(error_message(502, "<html>Bad Gateway</html>"), "API error 502");
        assert_eq!(error_message(500, r#"{"success":false}"#), "API error 500");
    }
}
