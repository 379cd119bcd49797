//! Wall-clock tick source and the time formats shown on the dashboard.

use chrono::{DateTime, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Publishes the current time once per period until dropped.
pub struct ClockTicker {
    now: watch::Receiver<DateTime<Utc>>,
    task: JoinHandle<()>,
}

impl ClockTicker {
    pub fn spawn(period: Duration) -> Self {
        let (tx, rx) = watch::channel(Utc::now());
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(Utc::now()).is_err() {
                    break;
                }
            }
        });
        Self { now: rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.now.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Rotation of the dial hand in degrees: one turn per minute.
pub fn dial_angle<T: Timelike>(now: &T) -> f64 {
    now.second() as f64 / 60.0 * 360.0
}

/// `HH:MM:SS`, 24-hour, in `tz`.
pub fn format_digital(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%H:%M:%S").to_string()
}

/// Abbreviations en-US spells out; every other zone is written as a GMT offset.
const US_ZONE_ABBREVIATIONS: &[&str] = &[
    "UTC", "EST", "EDT", "CST", "CDT", "MST", "MDT", "PST", "PDT", "AKST", "AKDT", "HST",
];

/// Zone name as en-US long time renders it: `EST`, `UTC`, `GMT+9`, `GMT+5:30`.
pub fn zone_name(time: &DateTime<Tz>) -> String {
    let abbreviation = time.format("%Z").to_string();
    if US_ZONE_ABBREVIATIONS.contains(&abbreviation.as_str()) {
        return abbreviation;
    }

    let offset = time.offset().fix().local_minus_utc();
    if offset == 0 {
        return "GMT".to_string();
    }
    let sign = if offset < 0 { '-' } else { '+' };
    let hours = offset.abs() / 3600;
    let minutes = offset.abs() % 3600 / 60;
    if minutes == 0 {
        format!("GMT{}{}", sign, hours)
    } else {
        format!("GMT{}{}:{:02}", sign, hours, minutes)
    }
}

/// Full date and long time, e.g. `Friday, October 16, 2026 at 2:03:07 PM GMT+9`.
pub fn format_long(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!(
        "{} {}",
        local.format("%A, %B %-d, %Y at %-I:%M:%S %p"),
        zone_name(&local)
    )
}

/// Block timestamp, e.g. `Nov 14, 2023, 22:15:00`. Out-of-range timestamps
/// render as the raw number.
pub fn format_block_time(timestamp: i64, tz: Tz) -> String {
    match tz.timestamp_opt(timestamp, 0).single() {
        Some(time) => time.format("%b %-d, %Y, %H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

/// Integer with comma thousands separators, e.g. `800,000`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
