//! HTTP client for the Distribuce24 OpenAPI
//!
//! Owns the OAuth2 token lifecycle and the paginated/batched retrieval of
//! quarter-hour consumption series.

use crate::config::ApiConfig;
use crate::error::{MetronError, Result};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::types::{Measurement, Token};
use super::{
    DEFAULT_TOKEN_TTL_SECS, OAUTH_SCOPE, OAUTH_TOKEN_ENDPOINT, PAGE_SIZE, PROFILE_CONSUMPTION,
    STATUS_VALID, TIMESTAMP_FORMAT, freshness_horizon,
};

/// One parsed page of the series endpoint
#[derive(Debug, Default)]
pub struct SeriesPage {
    /// Record count the server claims for the whole range
    pub total: usize,

    /// Records carried by this page, in upstream order
    pub records: Vec<Measurement>,
}

/// Metering API client with cached OAuth2 token
pub struct EgdClient {
    http: reqwest::Client,
    token_url: String,
    data_url: String,
    client_id: String,
    client_secret: String,
    token: Option<Token>,
    logger: StructuredLogger,
}

impl EgdClient {
    /// Create a new client from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            token_url: config.token_url.trim_end_matches('/').to_string(),
            data_url: config.data_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: None,
            logger: get_logger("egd"),
        })
    }

    /// Get or refresh the OAuth2 access token
    ///
    /// Reuses the cached token while it is valid; otherwise performs a
    /// client-credentials exchange against the identity server.
    pub async fn get_access_token(&mut self) -> Result<String> {
        let now = Utc::now();

        if let Some(token) = &self.token
            && token.is_valid_at(now)
        {
            return Ok(token.access_token.clone());
        }

        let url = format!("{}{}", self.token_url, OAUTH_TOKEN_ENDPOINT);
        let payload = serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "scope": OAUTH_SCOPE,
        });

        let response = self.http.post(&url).json(&payload).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MetronError::auth("Invalid client credentials"));
        }
        if status != reqwest::StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(MetronError::api(format!(
                "Token error {}: {}",
                status.as_u16(),
                text
            )));
        }

        let body: Value = response.json().await?;
        let Some(access_token) = body.get("access_token").and_then(|v| v.as_str()) else {
            return Err(MetronError::api("No access token in response"));
        };
        let expires_in = body
            .get("expires")
            .and_then(|v| v.as_i64())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        self.token = Some(Token {
            access_token: access_token.to_string(),
            expires_at: now + chrono::Duration::seconds(expires_in),
        });

        Ok(access_token.to_string())
    }

    /// Issue one authenticated request, refreshing the token on a single 401
    ///
    /// The retry is bounded to exactly one fresh-token attempt; a second 401
    /// fails with an auth error.
    async fn request(
        &mut self,
        method: reqwest::Method,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let mut retried = false;

        loop {
            let token = self.get_access_token().await?;

            let response = self
                .http
                .request(method.clone(), url)
                .bearer_auth(&token)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(params)
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.token = None;
                if retried {
                    return Err(MetronError::auth("Access token expired or invalid"));
                }
                self.logger.debug("Token expired, retrying with fresh token");
                retried = true;
                continue;
            }
            if status != reqwest::StatusCode::OK {
                let text = response.text().await.unwrap_or_default();
                return Err(MetronError::api(format!(
                    "API error {}: {}",
                    status.as_u16(),
                    text
                )));
            }

            return Ok(response.json().await?);
        }
    }

    /// Get quarter-hour consumption data for an inclusive day range
    ///
    /// The API reports power in kW per 15-minute interval; records are
    /// converted to kWh by dividing by 4. Follows the server-declared total
    /// across pages and concatenates results in order.
    pub async fn get_consumption_data(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page_start: usize,
    ) -> Result<Vec<Measurement>> {
        let url = format!("{}/spotreby", self.data_url);
        let mut page_start = page_start;
        let mut results: Vec<Measurement> = Vec::new();

        loop {
            let params = [
                ("ean", ean.to_string()),
                ("profile", PROFILE_CONSUMPTION.to_string()),
                (
                    "from",
                    format!("{}T00:00:00.000Z", start_date.format("%Y-%m-%d")),
                ),
                (
                    "to",
                    format!("{}T23:59:59.999Z", end_date.format("%Y-%m-%d")),
                ),
                ("PageStart", page_start.to_string()),
                ("PageSize", PAGE_SIZE.to_string()),
            ];

            let body = self.request(reqwest::Method::GET, &url, &params).await?;
            let page = parse_series_page(&body);
            let fetched = page.records.len();
            results.extend(page.records);

            if page.total == 0 || page_start + fetched >= page.total {
                break;
            }
            if fetched == 0 {
                // An empty page despite a larger declared total would loop forever
                self.logger.warn(&format!(
                    "Server declared {} records but returned an empty page at offset {}",
                    page.total, page_start
                ));
                break;
            }

            self.logger.debug(&format!(
                "Pagination needed: fetched {} of {} records, fetching next page",
                page_start + fetched,
                page.total
            ));
            page_start += fetched;
        }

        Ok(results)
    }

    /// Get consumption data for a wide range in calendar-month batches
    ///
    /// The API caps a page near one month of quarter-hour data, so the range
    /// is split per month. The overall end date is clamped to the freshness
    /// horizon (data must be at least two days old); a range entirely inside
    /// the exclusion window yields an empty result without any request.
    pub async fn get_consumption_data_batch(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Measurement>> {
        let mut all_results: Vec<Measurement> = Vec::new();

        let effective_end = freshness_horizon(Utc::now().date_naive()).min(end_date);
        if effective_end < start_date {
            self.logger.warn(&format!(
                "Requested end date {} is too recent, nothing to fetch before {}",
                end_date, start_date
            ));
            return Ok(all_results);
        }

        for (index, (chunk_start, chunk_end)) in month_chunks(start_date, effective_end)
            .into_iter()
            .enumerate()
        {
            self.logger.info(&format!(
                "Fetching batch {}: {} to {}",
                index + 1,
                chunk_start,
                chunk_end
            ));

            match self.get_consumption_data(ean, chunk_start, chunk_end, 0).await {
                Ok(batch) => {
                    self.logger
                        .info(&format!("Batch {}: fetched {} records", index + 1, batch.len()));
                    all_results.extend(batch);
                }
                Err(err) => {
                    // Continue with the next month rather than aborting the whole batch
                    self.logger
                        .error(&format!("Failed to fetch batch {}: {}", index + 1, err));
                }
            }
        }

        Ok(all_results)
    }
}

/// Parse one response of the series endpoint
///
/// The endpoint returns an array of objects, each carrying a declared `total`
/// and a `data` array of records. Malformed shapes are skipped, not fatal.
pub fn parse_series_page(body: &Value) -> SeriesPage {
    let mut page = SeriesPage::default();

    let Some(items) = body.as_array() else {
        warn!("Unexpected data format from API, expected an array");
        return page;
    };

    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };

        if let Some(total) = obj.get("total").and_then(|v| v.as_u64())
            && total > 0
        {
            page.total = total as usize;
        }

        let Some(points) = obj.get("data").and_then(|v| v.as_array()) else {
            continue;
        };
        for record in points {
            let Some(record) = record.as_object() else {
                continue;
            };
            let Some(ts_str) = record.get("timestamp").and_then(|v| v.as_str()) else {
                continue;
            };
            let timestamp = match NaiveDateTime::parse_from_str(ts_str, TIMESTAMP_FORMAT) {
                Ok(naive) => naive.and_utc(),
                Err(_) => {
                    warn!("Invalid timestamp format: {}, skipping", ts_str);
                    continue;
                }
            };

            // 15 minutes of kW is a quarter of a kWh; null readings stay null
            let value = record.get("value").and_then(|v| v.as_f64()).map(|kw| kw / 4.0);
            let status = record
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or(STATUS_VALID)
                .to_string();

            page.records.push(Measurement {
                timestamp,
                value,
                status,
            });
        }
    }

    page
}

/// Split an inclusive date range into per-calendar-month chunks
pub fn month_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut current = start;

    while current <= end {
        let next_month = if current.month() == 12 {
            NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(current.year(), current.month() + 1, 1)
        };
        let Some(next_month) = next_month else {
            break;
        };
        let month_end = next_month.pred_opt().unwrap_or(next_month);
        chunks.push((current, month_end.min(end)));
        current = next_month;
    }

    chunks
}

#[async_trait::async_trait]
impl crate::coordinator::ConsumptionSource for EgdClient {
    async fn consumption(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Measurement>> {
        self.get_consumption_data(ean, start_date, end_date, 0).await
    }

    async fn consumption_batched(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Measurement>> {
        self.get_consumption_data_batch(ean, start_date, end_date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn series_page_converts_kw_to_kwh() {
        let body = json!([
            {
                "ean/eic": "859182400100366666",
                "profile": "ICC1",
                "units": "KW",
                "total": 2,
                "data": [
                    {"timestamp": "2023-03-01T00:45:00.000Z", "value": 0.5, "status": "IU012"},
                    {"timestamp": "2023-03-01T01:00:00.000Z", "value": 0.75, "status": "IU012"},
                ],
            }
        ]);

        let page = parse_series_page(&body);
        assert_eq!(page.total, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].value, Some(0.125));
        assert_eq!(page.records[1].value, Some(0.1875));
        assert_eq!(page.records[0].status, "IU012");
    }

    #[test]
    fn series_page_keeps_nulls_and_defaults_status() {
        let body = json!([
            {
                "total": 2,
                "data": [
                    {"timestamp": "2023-03-01T00:45:00.000Z", "value": null, "status": "IU011"},
                    {"timestamp": "2023-03-01T01:00:00.000Z", "value": 0.75},
                ],
            }
        ]);

        let page = parse_series_page(&body);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].value, None);
        assert_eq!(page.records[0].status, "IU011");
        // Missing status falls back to the known-good code
        assert_eq!(page.records[1].status, STATUS_VALID);
    }

    #[test]
    fn series_page_skips_malformed_entries() {
        let body = json!([
            "not an object",
            {
                "total": 3,
                "data": [
                    42,
                    {"value": 1.0, "status": "IU012"},
                    {"timestamp": "yesterday-ish", "value": 1.0, "status": "IU012"},
                    {"timestamp": "2023-03-01T00:15:00.000Z", "value": 1.0, "status": "IU012"},
                ],
            }
        ]);

        let page = parse_series_page(&body);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].value, Some(0.25));
    }

    #[test]
    fn series_page_rejects_non_array_body() {
        let page = parse_series_page(&json!({"total": 4}));
        assert_eq!(page.total, 0);
        assert!(page.records.is_empty());
    }

    #[test]
    fn series_page_parses_timestamp_without_fraction() {
        let body = json!([
            {"total": 1, "data": [
                {"timestamp": "2023-03-01T00:15:00Z", "value": 2.0, "status": "IU012"},
            ]}
        ]);
        let page = parse_series_page(&body);
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn month_chunks_within_one_month() {
        let chunks = month_chunks(date(2023, 5, 10), date(2023, 5, 20));
        assert_eq!(chunks, vec![(date(2023, 5, 10), date(2023, 5, 20))]);
    }

    #[test]
    fn month_chunks_spanning_two_months() {
        let chunks = month_chunks(date(2023, 1, 1), date(2023, 2, 28));
        assert_eq!(
            chunks,
            vec![
                (date(2023, 1, 1), date(2023, 1, 31)),
                (date(2023, 2, 1), date(2023, 2, 28)),
            ]
        );
    }

    #[test]
    fn month_chunks_mid_month_boundaries() {
        let chunks = month_chunks(date(2023, 1, 15), date(2023, 3, 10));
        assert_eq!(
            chunks,
            vec![
                (date(2023, 1, 15), date(2023, 1, 31)),
                (date(2023, 2, 1), date(2023, 2, 28)),
                (date(2023, 3, 1), date(2023, 3, 10)),
            ]
        );
    }

    #[test]
    fn month_chunks_across_year_boundary() {
        let chunks = month_chunks(date(2023, 12, 15), date(2024, 1, 10));
        assert_eq!(
            chunks,
            vec![
                (date(2023, 12, 15), date(2023, 12, 31)),
                (date(2024, 1, 1), date(2024, 1, 10)),
            ]
        );
    }

    #[test]
    fn month_chunks_empty_when_end_precedes_start() {
        assert!(month_chunks(date(2023, 3, 10), date(2023, 3, 1)).is_empty());
    }

    fn test_client() -> EgdClient {
        let config = crate::config::ApiConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..crate::config::ApiConfig::default()
        };
        EgdClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn batch_inside_freshness_window_is_empty_without_requests() {
        let mut client = test_client();
        let today = Utc::now().date_naive();

        // Yesterday and today are still inside the exclusion window
        let results = client
            .get_consumption_data_batch("859182400100366666", today, today)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn batch_with_inverted_range_is_empty() {
        let mut client = test_client();
        let start = Utc::now().date_naive();
        let end = start - chrono::Duration::days(30);

        let results = client
            .get_consumption_data_batch("859182400100366666", start, end)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
