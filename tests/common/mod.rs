#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use btc_clock::{BlockDetails, BlockHash, BlockSource, ExplorerError, Height};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const TIP: Height = 800_000;
pub const TIP_TIMESTAMP: i64 = 1_700_000_100;
pub const PREVIOUS_TIMESTAMP: i64 = 1_700_000_000;

/// Deterministic 64-hex-digit hash for a height.
pub fn stub_hash(height: Height) -> String {
    format!("{:064x}", height)
}

fn height_of(hash: &str) -> Option<Height> {
    Height::from_str_radix(hash, 16).ok()
}

fn default_timestamps() -> HashMap<Height, i64> {
    HashMap::from([(TIP, TIP_TIMESTAMP), (TIP - 1, PREVIOUS_TIMESTAMP)])
}

/// In-memory block source with scriptable failures.
pub struct FakeExplorer {
    tip: Height,
    timestamps: HashMap<Height, i64>,
    /// Number of upcoming `tip_height` calls that answer HTTP 503.
    failures: AtomicU32,
    /// Delay before every `tip_height` answer.
    tip_delay: Mutex<Duration>,
    /// Fail the hash lookup of the previous block.
    fail_previous: AtomicBool,
    tip_calls: Mutex<Vec<Instant>>,
}

impl FakeExplorer {
    pub fn new() -> Self {
        Self::with_tip(TIP)
    }

    /// Chain whose tip is `tip`; the tip and its parent, if any, are known.
    pub fn with_tip(tip: Height) -> Self {
        let mut timestamps = HashMap::from([(tip, TIP_TIMESTAMP)]);
        if let Some(previous) = tip.checked_sub(1) {
            timestamps.insert(previous, PREVIOUS_TIMESTAMP);
        }
        Self {
            tip,
            timestamps,
            failures: AtomicU32::new(0),
            tip_delay: Mutex::new(Duration::ZERO),
            fail_previous: AtomicBool::new(false),
            tip_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failures: u32) -> Self {
        let fake = Self::new();
        fake.set_failures(failures);
        fake
    }

    pub fn set_failures(&self, failures: u32) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    pub fn set_tip_delay(&self, delay: Duration) {
        *self.tip_delay.lock().unwrap() = delay;
    }

    pub fn set_fail_previous(&self, fail: bool) {
        self.fail_previous.store(fail, Ordering::SeqCst);
    }

    /// Paused-clock instants at which `tip_height` was called.
    pub fn tip_calls(&self) -> Vec<Instant> {
        self.tip_calls.lock().unwrap().clone()
    }

    pub fn tip_call_count(&self) -> usize {
        self.tip_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BlockSource for FakeExplorer {
    async fn tip_height(&self) -> Result<Height, ExplorerError> {
        self.tip_calls.lock().unwrap().push(Instant::now());

        let delay = *self.tip_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ExplorerError::Status {
                path: "/blocks/tip/height".to_string(),
                status: 503,
            });
        }
        Ok(self.tip)
    }

    async fn block_hash(&self, height: Height) -> Result<BlockHash, ExplorerError> {
        if self.fail_previous.load(Ordering::SeqCst) && height + 1 == self.tip {
            return Err(ExplorerError::Status {
                path: format!("/block-height/{}", height),
                status: 500,
            });
        }
        Ok(stub_hash(height))
    }

    async fn block(&self, hash: &str) -> Result<BlockDetails, ExplorerError> {
        height_of(hash)
            .and_then(|h| self.timestamps.get(&h))
            .map(|ts| BlockDetails::at(*ts))
            .ok_or_else(|| ExplorerError::Status {
                path: format!("/block/{}", hash),
                status: 404,
            })
    }
}

/// Behaviour of the HTTP stub explorer.
pub struct StubChain {
    pub tip: Height,
    pub timestamps: HashMap<Height, i64>,
    pub tip_status: StatusCode,
    pub tip_body: Option<String>,
    pub tip_delay: Duration,
    pub fail_hash_at: Option<Height>,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            tip: TIP,
            timestamps: default_timestamps(),
            tip_status: StatusCode::OK,
            tip_body: None,
            tip_delay: Duration::ZERO,
            fail_hash_at: None,
        }
    }
}

async fn tip_height(State(chain): State<Arc<StubChain>>) -> (StatusCode, String) {
    if !chain.tip_delay.is_zero() {
        tokio::time::sleep(chain.tip_delay).await;
    }
    let body = chain
        .tip_body
        .clone()
        .unwrap_or_else(|| chain.tip.to_string());
    (chain.tip_status, body)
}

async fn block_height(
    Path(height): Path<Height>,
    State(chain): State<Arc<StubChain>>,
) -> (StatusCode, String) {
    if chain.fail_hash_at == Some(height) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string());
    }
    if !chain.timestamps.contains_key(&height) {
        return (StatusCode::NOT_FOUND, "Block not found".to_string());
    }
    (StatusCode::OK, stub_hash(height))
}

async fn block(Path(hash): Path<String>, State(chain): State<Arc<StubChain>>) -> Response {
    match height_of(&hash).and_then(|h| chain.timestamps.get(&h).map(|ts| (h, *ts))) {
        Some((height, timestamp)) => Json(serde_json::json!({
            "id": hash,
            "height": height,
            "version": 536870912,
            "timestamp": timestamp,
            "tx_count": 3000,
            "size": 1500000,
            "weight": 3990000,
            "mediantime": timestamp - 3000,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "Block not found").into_response(),
    }
}

/// Router serving the mempool.space endpoints under `/api`.
pub fn mempool_router(chain: StubChain) -> Router {
    Router::new()
        .route("/api/blocks/tip/height", get(tip_height))
        .route("/api/block-height/:height", get(block_height))
        .route("/api/block/:hash", get(block))
        .with_state(Arc::new(chain))
}

/// Serve `chain` on an ephemeral port and return the API base URL.
pub async fn spawn_stub_explorer(chain: StubChain) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mempool_router(chain)).await.unwrap();
    });
    format!("http://{}/api", addr)
}
