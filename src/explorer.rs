//! Block explorer client for the mempool.space REST API.
//!
//! The poller only talks to the [`BlockSource`] trait; [`ExplorerClient`] is
//! the HTTP implementation used by the binary.

use crate::types::{BlockDetails, BlockHash, Height};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://mempool.space/api";

/// Failures of a single explorer call or of a whole fetch attempt.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("block {0} has no previous block")]
    NoPreviousBlock(Height),
}

/// The three explorer calls a fetch attempt is built from.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current chain tip height.
    async fn tip_height(&self) -> Result<Height, ExplorerError>;

    /// Hash of the block at `height`.
    async fn block_hash(&self, height: Height) -> Result<BlockHash, ExplorerError>;

    /// Details of the block identified by `hash`.
    async fn block(&self, hash: &str) -> Result<BlockDetails, ExplorerError>;
}

/// HTTP client for a mempool.space compatible API.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    base_url: String,
    http: reqwest::Client,
}

impl ExplorerClient {
    /// Create a client for `base_url` (e.g. `https://mempool.space/api`).
    pub fn new(base_url: &str) -> Result<Self, ExplorerError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("btc-clock/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        info!("Using block explorer at {}", base_url);
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host part of the base URL, used in user-facing messages.
    pub fn host(&self) -> &str {
        host_of(&self.base_url)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ExplorerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_text(&self, path: &str) -> Result<String, ExplorerError> {
        let body = self.get(path).await?.text().await?;
        Ok(body.trim().to_string())
    }
}

#[async_trait]
impl BlockSource for ExplorerClient {
    async fn tip_height(&self) -> Result<Height, ExplorerError> {
        let path = "/blocks/tip/height";
        let body = self.get_text(path).await?;
        parse_height(path, &body)
    }

    async fn block_hash(&self, height: Height) -> Result<BlockHash, ExplorerError> {
        let path = format!("/block-height/{}", height);
        let body = self.get_text(&path).await?;
        if body.is_empty() {
            return Err(ExplorerError::Malformed {
                path,
                reason: "empty block hash".to_string(),
            });
        }
        Ok(body)
    }

    async fn block(&self, hash: &str) -> Result<BlockDetails, ExplorerError> {
        let path = format!("/block/{}", hash);
        let bytes = self.get(&path).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ExplorerError::Malformed {
            path,
            reason: e.to_string(),
        })
    }
}

fn parse_height(path: &str, body: &str) -> Result<Height, ExplorerError> {
    body.parse().map_err(|_| ExplorerError::Malformed {
        path: path.to_string(),
        reason: format!("expected block height, got {:?}", body),
    })
}

/// Strip scheme, path and port from a URL.
pub fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    authority.split(':').next().unwrap_or(authority)
}

impl ExplorerError {
    /// HTTP status code, for status failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExplorerError::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            ExplorerError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
