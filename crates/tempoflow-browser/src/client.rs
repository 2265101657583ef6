//! Browser-farm REST client
//!
//! Talks to the local anti-detect browser farm's HTTP API (AdsPower-compatible
//! endpoints): profile lookup by serial number, browser start/stop, and a
//! liveness probe. Every response is the same `{code, msg, data}` envelope;
//! any non-zero code is an API error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempoflow_core::{retry_with_backoff, RetryConfig, SessionState};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Farm API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Base URL of the local farm API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Optional API key appended to every request
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Milliseconds to let a freshly started browser settle before connecting
    #[serde(default = "default_launch_settle_ms")]
    pub launch_settle_ms: u64,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            launch_settle_ms: default_launch_settle_ms(),
        }
    }
}

fn default_api_url() -> String {
    "http://local.adspower.net:50325".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_launch_settle_ms() -> u64 {
    3000
}

/// One profile as the farm reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct FarmProfile {
    /// Farm-internal profile id, used by the browser endpoints
    pub user_id: String,
    /// Serial number, as shown in the farm UI
    #[serde(default)]
    pub serial_number: Option<serde_json::Value>,
}

/// Endpoints a freshly started browser exposes.
#[derive(Debug, Clone)]
pub struct StartedBrowser {
    /// CDP websocket endpoint for automation
    pub ws_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// HTTP client for the farm API.
pub struct FarmClient {
    config: FarmConfig,
    http: reqwest::Client,
}

impl FarmClient {
    /// Client over the given settings.
    pub fn new(config: FarmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint);
        debug!(url = %url, "farm api request");

        let mut query: Vec<(&str, String)> = params.to_vec();
        if !self.config.api_key.is_empty() {
            query.push(("api_key", self.config.api_key.clone()));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::Unreachable(e.to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        let envelope: ApiEnvelope = response.json().await?;
        if envelope.code != 0 {
            return Err(Error::Api(
                envelope.msg.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(envelope.data)
    }

    /// Probe the farm API.
    pub async fn check_connection(&self) -> Result<()> {
        self.request("/status", &[]).await?;
        info!(url = %self.config.api_url, "farm api reachable");
        Ok(())
    }

    /// Look up a profile by serial number, with retry for flaky local APIs.
    pub async fn profile_by_serial(&self, serial_number: u32) -> Result<FarmProfile> {
        let retry = RetryConfig::default()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_secs(2));

        let data = retry_with_backoff(
            &retry,
            || {
                let serial = serial_number.to_string();
                async move {
                    self.request("/api/v1/user/list", &[("serial_number", serial)])
                        .await
                }
            },
            |e| !matches!(e, Error::Api(_)),
        )
        .await?;

        let profiles: Vec<FarmProfile> = serde_json::from_value(
            data.get("list").cloned().unwrap_or(serde_json::Value::Null),
        )
        .unwrap_or_default();

        profiles
            .into_iter()
            .next()
            .ok_or(Error::ProfileNotFound(serial_number))
    }

    /// Start the profile's browser and return its automation endpoint.
    pub async fn start_browser(&self, user_id: &str) -> Result<StartedBrowser> {
        let data = self
            .request(
                "/api/v1/browser/start",
                &[
                    ("user_id", user_id.to_string()),
                    ("open_tabs", "1".to_string()),
                ],
            )
            .await?;

        let ws_endpoint = data
            .pointer("/ws/puppeteer")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Api("no cdp endpoint in start response".to_string()))?;

        info!(user_id, "browser started");
        Ok(StartedBrowser { ws_endpoint })
    }

    /// Stop the profile's browser. Idempotent from the caller's view.
    pub async fn stop_browser(&self, user_id: &str) -> Result<()> {
        match self
            .request("/api/v1/browser/stop", &[("user_id", user_id.to_string())])
            .await
        {
            Ok(_) => {
                info!(user_id, "browser stopped");
                Ok(())
            }
            Err(Error::Api(msg)) => {
                // Stopping an already-stopped browser is fine.
                warn!(user_id, msg = %msg, "stop reported an api error, ignoring");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the profile's browser is currently running.
    pub async fn browser_status(&self, user_id: &str) -> Result<SessionState> {
        let data = self
            .request("/api/v1/browser/active", &[("user_id", user_id.to_string())])
            .await?;
        let active = data
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s.eq_ignore_ascii_case("active"))
            .unwrap_or(false);
        Ok(if active {
            SessionState::Active
        } else {
            SessionState::Inactive
        })
    }

    /// Post-start settle delay.
    #[must_use]
    pub fn launch_settle(&self) -> Duration {
        Duration::from_millis(self.config.launch_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farm_config_defaults() {
        let config = FarmConfig::default();
        assert!(config.api_url.contains("50325"));
        assert!(config.api_key.is_empty());
        assert_eq!(config.launch_settle_ms, 3000);
    }

    #[test]
    fn test_envelope_nonzero_code_is_api_error() {
        let envelope: ApiEnvelope =
            serde_json::from_str(r#"{"code": -1, "msg": "user not exist"}"#).unwrap();
        assert_eq!(envelope.code, -1);
        assert_eq!(envelope.msg.as_deref(), Some("user not exist"));
    }

    #[test]
    fn test_profile_list_parsing() {
        let data: serde_json::Value = serde_json::from_str(
            r#"{"list": [{"user_id": "abc123", "serial_number": "17"}]}"#,
        )
        .unwrap();
        let profiles: Vec<FarmProfile> =
            serde_json::from_value(data.get("list").cloned().unwrap()).unwrap();
        assert_eq!(profiles[0].user_id, "abc123");
    }

    #[test]
    fn test_started_browser_endpoint_extraction() {
        let data: serde_json::Value = serde_json::from_str(
            r#"{"ws": {"puppeteer": "ws://127.0.0.1:9222/devtools/browser/xyz", "selenium": "127.0.0.1:9222"}}"#,
        )
        .unwrap();
        let ws = data.pointer("/ws/puppeteer").and_then(|v| v.as_str()).unwrap();
        assert!(ws.starts_with("ws://"));
    }
}
