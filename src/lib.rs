pub mod clock;
pub mod config;
pub mod explorer;
pub mod poller;
pub mod retry;
pub mod timezone;
pub mod types;
pub mod ui;

pub use clock::ClockTicker;
pub use explorer::{BlockSource, ExplorerClient, ExplorerError};
pub use poller::{fetch_block_info, BlockPoller, PollerConfig, PollerHandle};
pub use retry::RetrySchedule;
pub use timezone::TimeZoneSelection;
pub use types::*;
