//! HTTP client for the peer status endpoint
//!
//! One GET per peer, bounded by a timeout. Every failure (transport error,
//! timeout, non-200 status, malformed body) turns into `None`: the caller skips
//! the peer for the current round. No retry, no backoff.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Number;
use thiserror::Error;

use crate::pt_interface::{PeerInfo, PeerInfoClient, Score, UNKNOWN_PEER_NAME};

pub const DEFAULT_ENDPOINT: &str = "https://dashboard.gensyn.ai/api/v1/peer";

/// Query parameter carrying the peer identifier
pub const PEER_ID_PARAM: &str = "id";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Success body of the endpoint; `null` and missing fields fall back to defaults
#[derive(Debug, serde::Deserialize)]
struct PeerBody {
    #[serde(rename = "peerName", default)]
    peer_name: Option<String>,
    #[serde(default)]
    score: Option<Number>,
    #[serde(default)]
    reward: Option<f64>,
}

/// Integers are taken exactly; only fractional values go through `f64`
fn score_from_number(number: &Number) -> Option<Score> {
    if let Some(score) = number.as_u64() {
        return Some(score);
    }
    let score = number.as_f64()?;
    if !score.is_finite() || score < 0.0 || score >= u64::MAX as f64 {
        return None;
    }
    Some(score as Score)
}

/// Parse a success body into `PeerInfo`.
///
/// Scores are win counts: negative or out of range values make the body
/// malformed, fractional values are truncated.
pub fn parse_peer_body(body: &str) -> Option<PeerInfo> {
    let parsed: PeerBody = serde_json::from_str(body).ok()?;

    let score = match &parsed.score {
        Some(number) => score_from_number(number)?,
        None => 0,
    };

    let reward = parsed.reward.unwrap_or(0.0);
    if !reward.is_finite() {
        return None;
    }

    Some(PeerInfo {
        name: parsed
            .peer_name
            .unwrap_or_else(|| UNKNOWN_PEER_NAME.to_string()),
        score,
        reward,
    })
}

pub struct HttpPeerClient {
    http: Client,
    endpoint: String,
}

impl HttpPeerClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

impl PeerInfoClient for HttpPeerClient {
    fn fetch(&self, peer_id: &str) -> Option<PeerInfo> {
        let response = match self
            .http
            .get(&self.endpoint)
            .query(&[(PEER_ID_PARAM, peer_id)])
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                debug!("fetch {}: {}", peer_id, e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!("fetch {}: status {}", peer_id, response.status());
            return None;
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                debug!("fetch {}: body {}", peer_id, e);
                return None;
            }
        };

        let info = parse_peer_body(&body);
        if info.is_none() {
            debug!("fetch {}: malformed body", peer_id);
        }
        info
    }
}
