//! Client for the UnwiredLabs LocationAPI.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::TowerId;

pub const DEFAULT_ENDPOINT: &str = "https://us1.unwiredlabs.com";

const RADIO: &str = "gsm";
// exact message the service uses for towers it has no data for
const NO_MATCHES: &str = "No matches found";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(StatusCode),
    #[error("rejected by service: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("{0}")]
    NoToken(String),
}

/// Position reported by a remote geolocation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteFix {
    pub lat: f64,
    pub lon: f64,
}

/// Remote lookup of a tower position. `Ok(None)` means the service
/// authoritatively reported no coverage for the tower, as opposed to
/// a failure to ask.
#[async_trait]
pub trait CellLocator: Send + Sync {
    async fn locate(&self, tower: TowerId) -> Result<Option<RemoteFix>, RemoteError>;
}

#[derive(Serialize)]
struct LocateRequest<'a> {
    token: &'a str,
    radio: &'static str,
    mcc: u16,
    mnc: u16,
    cells: [CellBlock; 1],
    address: u8,
}

#[derive(Serialize)]
struct CellBlock {
    lac: i64,
    cid: i64,
}

#[derive(Deserialize)]
struct LocateResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

pub struct UnwiredClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl UnwiredClient {
    /// Single attempt per call, transport-default timeouts, no retry.
    pub fn new(endpoint: &str, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/v2/process.php", endpoint.trim_end_matches('/')),
            token: token.into(),
        }
    }
}

#[async_trait]
impl CellLocator for UnwiredClient {
    async fn locate(&self, tower: TowerId) -> Result<Option<RemoteFix>, RemoteError> {
        let request = LocateRequest {
            token: &self.token,
            radio: RADIO,
            mcc: tower.mcc,
            mnc: tower.mnc,
            cells: [CellBlock {
                lac: tower.lac,
                cid: tower.cid,
            }],
            address: 1,
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }

        let body = response.text().await?;
        let response: LocateResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(e.to_string()))?;
        interpret(response)
    }
}

/// Stand-in locator for setups without an API token: every lookup that
/// reaches the network fails with the carried message. Cache hits never
/// get here.
pub struct MissingToken(pub String);

#[async_trait]
impl CellLocator for MissingToken {
    async fn locate(&self, _tower: TowerId) -> Result<Option<RemoteFix>, RemoteError> {
        Err(RemoteError::NoToken(self.0.clone()))
    }
}

fn interpret(response: LocateResponse) -> Result<Option<RemoteFix>, RemoteError> {
    if response.status == "ok" {
        match (response.lat, response.lon) {
            (Some(lat), Some(lon)) => Ok(Some(RemoteFix { lat, lon })),
            _ => Err(RemoteError::Malformed(
                "status ok without coordinates".to_string(),
            )),
        }
    } else {
        let message = response
            .message
            .unwrap_or_else(|| "unspecified error".to_string());
        if message == NO_MATCHES {
            Ok(None)
        } else {
            Err(RemoteError::Rejected(message))
        }
    }
}
