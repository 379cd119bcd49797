//! Block info poller.
//!
//! A single task owns the poll schedule: one attempt at start, one per
//! interval tick, retries from the [`RetrySchedule`] after failures, and manual
//! refreshes. Attempts run one at a time inside that task, so results are
//! never interleaved. State is published through a `watch` channel; the
//! poller is its only writer.

use crate::explorer::{BlockSource, ExplorerError};
use crate::retry::RetrySchedule;
use crate::types::{BlockInfo, PollState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// User-facing error strings. The underlying cause is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessages {
    pub retrying: String,
    pub exhausted: String,
}

impl ErrorMessages {
    pub fn for_host(host: &str) -> Self {
        Self {
            retrying: format!("Unable to connect to {}. Retrying...", host),
            exhausted: format!(
                "Unable to connect to {}. Please check your connection and refresh.",
                host
            ),
        }
    }
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self::for_host("mempool.space")
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Period of the regular refresh.
    pub interval: Duration,
    /// Budget shared by every request of one attempt.
    pub attempt_timeout: Duration,
    pub retry: RetrySchedule,
    pub messages: ErrorMessages,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry: RetrySchedule::default(),
            messages: ErrorMessages::default(),
        }
    }
}

impl PollState {
    /// Apply a successful attempt.
    pub fn record_success(&mut self, info: BlockInfo) {
        self.block_info = Some(info);
        self.error = None;
        self.retry_count = 0;
        self.loading = false;
    }

    /// Apply a failed attempt. Returns the delay before the next retry, or
    /// `None` when the schedule is exhausted.
    pub fn record_failure(
        &mut self,
        schedule: &RetrySchedule,
        messages: &ErrorMessages,
    ) -> Option<Duration> {
        self.loading = false;
        match schedule.delay_for(self.retry_count) {
            Some(delay) => {
                self.error = Some(messages.retrying.clone());
                self.retry_count += 1;
                Some(delay)
            }
            None => {
                self.error = Some(messages.exhausted.clone());
                None
            }
        }
    }
}

/// Run one fetch attempt: tip height, tip hash, tip details, then the
/// previous block's hash and details.
///
/// Every request shares `timeout`; when it elapses the in-flight request is
/// dropped and the attempt fails with [`ExplorerError::Timeout`].
pub async fn fetch_block_info<S>(source: &S, timeout: Duration) -> Result<BlockInfo, ExplorerError>
where
    S: BlockSource + ?Sized,
{
    time::timeout(timeout, fetch_chain(source))
        .await
        .map_err(|_| ExplorerError::Timeout(timeout))?
}

async fn fetch_chain<S>(source: &S) -> Result<BlockInfo, ExplorerError>
where
    S: BlockSource + ?Sized,
{
    let height = source.tip_height().await?;
    let hash = source.block_hash(height).await?;
    let tip = source.block(&hash).await?;

    let previous_height = height
        .checked_sub(1)
        .ok_or(ExplorerError::NoPreviousBlock(height))?;
    let previous_hash = source.block_hash(previous_height).await?;
    let previous = source.block(&previous_hash).await?;

    Ok(BlockInfo::from_pair(height, &tip, &previous))
}

/// Handle to a running poller. Dropping it stops the poller, cancelling any
/// in-flight attempt and pending retry.
pub struct PollerHandle {
    state: watch::Receiver<PollState>,
    refresh: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// New receiver for state updates.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Ask for an immediate attempt with a fresh retry budget. Returns false
    /// when a refresh is already queued.
    pub fn request_refresh(&self) -> bool {
        self.refresh.try_send(()).is_ok()
    }

    /// Sender for refresh requests, for consumers that outlive a borrow.
    pub fn refresh_sender(&self) -> mpsc::Sender<()> {
        self.refresh.clone()
    }

    /// Stop the poller and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        debug!("Block poller stopped");
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct BlockPoller<S: ?Sized> {
    source: Arc<S>,
    config: PollerConfig,
    state: watch::Sender<PollState>,
    refresh: mpsc::Receiver<()>,
}

impl<S> BlockPoller<S>
where
    S: BlockSource + ?Sized + 'static,
{
    /// Start polling `source` on the current tokio runtime.
    pub fn spawn(source: Arc<S>, config: PollerConfig) -> PollerHandle {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        info!(
            "Starting block poller: interval {:?}, attempt timeout {:?}, {} retries",
            config.interval,
            config.attempt_timeout,
            config.retry.max_retries()
        );

        let poller = Self {
            source,
            config,
            state: state_tx,
            refresh: refresh_rx,
        };
        let task = tokio::spawn(poller.run());

        PollerHandle {
            state: state_rx,
            refresh: refresh_tx,
            task,
        }
    }

    async fn run(mut self) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    debug!("Scheduled block poll");
                }
                _ = wait_until(retry_at) => {
                    debug!("Retrying block poll");
                }
                Some(()) = self.refresh.recv() => {
                    info!("Manual refresh requested");
                    self.state.send_modify(|state| state.retry_count = 0);
                }
            }

            retry_at = self.attempt().await.map(|delay| Instant::now() + delay);
        }
    }

    /// Run one attempt and publish its outcome. Returns the retry delay, if
    /// a retry should be scheduled.
    async fn attempt(&mut self) -> Option<Duration> {
        match fetch_block_info(self.source.as_ref(), self.config.attempt_timeout).await {
            Ok(info) => {
                info!(
                    "Block {} at {} ({}s after previous)",
                    info.height, info.timestamp, info.last_block_time
                );
                self.state.send_modify(|state| state.record_success(info));
                None
            }
            Err(e) => {
                warn!("Error fetching block info: {}", e);
                let mut next_retry = None;
                self.state.send_modify(|state| {
                    next_retry = state.record_failure(&self.config.retry, &self.config.messages);
                });
                match next_retry {
                    Some(delay) => debug!("Next retry in {:?}", delay),
                    None => warn!("Retries exhausted, waiting for the next scheduled poll"),
                }
                next_retry
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
