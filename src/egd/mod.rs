//! EGD Distribuce24 metering API integration
//!
//! This module talks to the distributor's OpenAPI: OAuth2 client-credentials
//! authentication, paginated retrieval of quarter-hour consumption series,
//! and month-chunked batch fetches for wide date ranges.

pub mod client;
pub mod types;

pub use client::{EgdClient, month_chunks, parse_series_page};
pub use types::{Measurement, Token};

use chrono::{Days, NaiveDate};

/// OAuth2 token endpoint path on the identity server
pub const OAUTH_TOKEN_ENDPOINT: &str = "/oauth/token";

/// OAuth2 scope granting access to the metering data API
pub const OAUTH_SCOPE: &str = "namerena_data_openapi";

/// Consumption profile code (quarter-hour active energy, consumption)
pub const PROFILE_CONSUMPTION: &str = "ICC1";

/// Production profile code (modeled but not fetched by this version)
pub const PROFILE_PRODUCTION: &str = "ISC1";

/// Status code marking a measurement as valid for summation
pub const STATUS_VALID: &str = "IU012";

/// Maximum number of records per page (roughly one month of quarter-hours)
pub const PAGE_SIZE: usize = 3000;

/// Token lifetime applied when the token response omits `expires`
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 41_017_000;

/// The API only serves data that is at least this many days old
pub const FRESHNESS_LAG_DAYS: u64 = 2;

/// Timestamp format used by the data endpoint
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Latest date the API will serve data for, as seen from `today`
pub fn freshness_horizon(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(FRESHNESS_LAG_DAYS))
        .unwrap_or(today)
}
