//! Command line and environment configuration.

use crate::explorer::{host_of, DEFAULT_API_BASE};
use crate::poller::{ErrorMessages, PollerConfig};
use crate::retry::RetrySchedule;
use crate::timezone::{TimeZoneError, TimeZoneSelection, DEFAULT_ZONE};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "btc-clock",
    version,
    about = "Bitcoin clock, world clock and latest block in your terminal",
    long_about = None
)]
pub struct Args {
    /// Block explorer API base URL.
    #[arg(long, env = "BTC_CLOCK_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Seconds between regular block polls.
    #[arg(long, env = "BTC_CLOCK_POLL_INTERVAL_SECS", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Budget in seconds shared by all requests of one poll attempt.
    #[arg(long, env = "BTC_CLOCK_REQUEST_TIMEOUT_SECS", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// Initial timezone, e.g. Asia/Tokyo.
    #[arg(long, env = "BTC_CLOCK_TIMEZONE", default_value = DEFAULT_ZONE)]
    pub timezone: String,

    /// Write logs to this file. The dashboard discards logs otherwise.
    #[arg(long, env = "BTC_CLOCK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Fetch the latest block once, print it as JSON and exit.
    #[arg(long)]
    pub once: bool,
}

impl Args {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            attempt_timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetrySchedule::default(),
            messages: ErrorMessages::for_host(host_of(&self.api_base)),
        }
    }

    pub fn selection(&self) -> Result<TimeZoneSelection, TimeZoneError> {
        TimeZoneSelection::with_zone(&self.timezone)
    }
}
