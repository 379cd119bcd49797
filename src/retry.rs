use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Fixed table of retry delays, indexed by how many retries already ran.
///
/// The table length is the retry budget: once `retry_count` reaches it no
/// further automatic retry is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_millis(2_000),
            Duration::from_millis(5_000),
            Duration::from_millis(10_000),
        ])
    }
}

impl RetrySchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Schedule that never retries.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// Maximum number of automatic retries.
    pub fn max_retries(&self) -> u32 {
        self.delays.len() as u32
    }

    /// Delay before the next retry, or `None` once the budget is spent.
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        self.delays.get(retry_count as usize).copied()
    }
}

/// Run `operation`, retrying failures on the schedule.
///
/// The operation runs at most `max_retries() + 1` times; the last error is
/// returned when the schedule is exhausted.
pub async fn retry_with_schedule<F, Fut, T, E>(
    schedule: &RetrySchedule,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry_count = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retry_count > 0 {
                    debug!("Operation succeeded after {} retries", retry_count);
                }
                return Ok(result);
            }
            Err(error) => match schedule.delay_for(retry_count) {
                Some(delay) => {
                    warn!(
                        "Attempt {} failed: {}, retrying in {:?}",
                        retry_count + 1,
                        error,
                        delay
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
                None => {
                    warn!(
                        "Max retries ({}) reached: {}",
                        schedule.max_retries(),
                        error
                    );
                    return Err(error);
                }
            },
        }
    }
}
