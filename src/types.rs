use serde::{Deserialize, Serialize};

/// Nominal Bitcoin block interval in seconds (ten minutes).
pub const MEDIAN_BLOCK_TIME_SECS: i64 = 600;

pub type Height = u64;
/// Seconds since the Unix epoch.
pub type UnixSeconds = i64;
pub type BlockHash = String;

/// Snapshot of the chain tip, replaced wholesale on every successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub height: Height,
    pub timestamp: UnixSeconds,
    /// Seconds between this block and its parent. Miner timestamps are not
    /// monotonic, so this can be negative.
    pub last_block_time: i64,
    pub median_block_time: i64,
}

impl BlockInfo {
    /// Build a snapshot from the tip and its parent.
    pub fn from_pair(height: Height, tip: &BlockDetails, previous: &BlockDetails) -> Self {
        Self {
            height,
            timestamp: tip.timestamp,
            last_block_time: tip.timestamp - previous.timestamp,
            median_block_time: MEDIAN_BLOCK_TIME_SECS,
        }
    }

    /// Whole minutes between this block and its parent, rounded down.
    pub fn minutes_since_previous(&self) -> i64 {
        self.last_block_time.div_euclid(60)
    }

    pub fn median_block_minutes(&self) -> i64 {
        self.median_block_time / 60
    }
}

/// Block detail object returned by `GET /block/{hash}`.
///
/// Only `timestamp` is required; the remaining fields are kept when the
/// explorer provides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetails {
    #[serde(default)]
    pub id: Option<BlockHash>,
    #[serde(default)]
    pub height: Option<Height>,
    pub timestamp: UnixSeconds,
    #[serde(default)]
    pub tx_count: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub weight: Option<u64>,
}

impl BlockDetails {
    /// Minimal details carrying only a timestamp.
    pub fn at(timestamp: UnixSeconds) -> Self {
        Self {
            id: None,
            height: None,
            timestamp,
            tx_count: None,
            size: None,
            weight: None,
        }
    }
}

/// State published by the block poller.
///
/// The presenter shows `error` when it is set and `block_info` otherwise;
/// `loading` only covers the time before the first attempt resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollState {
    pub block_info: Option<BlockInfo>,
    pub error: Option<String>,
    pub loading: bool,
    pub retry_count: u32,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            block_info: None,
            error: None,
            loading: true,
            retry_count: 0,
        }
    }
}
