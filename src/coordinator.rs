//! Update coordination for Metron
//!
//! This module owns the running consumption total: it drives the one-time
//! backfill and the recurring incremental updates, and publishes a current
//! snapshot for consumers such as the web server.

use crate::config::MeterConfig;
use crate::egd::{Measurement, STATUS_VALID, freshness_horizon};
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Source of quarter-hour consumption series
///
/// Implemented by the API client; mocked in tests.
#[async_trait::async_trait]
pub trait ConsumptionSource: Send {
    /// Fetch one inclusive day range (paginated internally)
    async fn consumption(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Measurement>>;

    /// Fetch a wide range in calendar-month batches
    async fn consumption_batched(
        &mut self,
        ean: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Measurement>>;
}

/// Published view of the coordinator state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterSnapshot {
    /// When this snapshot was built (RFC 3339)
    pub timestamp: String,

    /// Metering point the readings belong to
    pub ean: String,

    /// Cumulative consumption since the daemon started, kWh
    pub consumption: f64,

    /// Cumulative production, kWh (placeholder, no production source yet)
    pub production: f64,

    /// Last calendar day folded into the totals
    pub last_processed_date: Option<NaiveDate>,
}

/// Coordinator for one metering point
pub struct MeterCoordinator {
    /// Measurement source (the API client in production)
    source: Box<dyn ConsumptionSource>,

    /// Metering point identifier
    ean: String,

    /// Backfill start date (clamped to the freshness horizon on first fetch)
    start_date: NaiveDate,

    /// Polling interval for incremental updates
    poll_interval: Duration,

    /// Running totals, process lifetime, never reset
    total_consumption: f64,
    total_production: f64,

    /// Last calendar day already folded into the totals
    last_date: Option<NaiveDate>,

    /// Snapshot broadcast to consumers
    snapshot_tx: watch::Sender<MeterSnapshot>,
    snapshot_rx: watch::Receiver<MeterSnapshot>,

    /// Shutdown signal
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,

    /// Logger with context
    logger: StructuredLogger,
}

impl MeterCoordinator {
    /// Create a new coordinator over a measurement source
    pub fn new(
        source: Box<dyn ConsumptionSource>,
        meter: &MeterConfig,
        poll_interval: Duration,
    ) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("coordinator").with_ean(meter.ean.clone()));
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        let initial = MeterSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            ean: meter.ean.clone(),
            consumption: 0.0,
            production: 0.0,
            last_processed_date: None,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        Self {
            source,
            ean: meter.ean.clone(),
            start_date: meter.start_date,
            poll_interval,
            total_consumption: 0.0,
            total_production: 0.0,
            last_date: None,
            snapshot_tx,
            snapshot_rx,
            shutdown_tx,
            shutdown_rx,
            logger,
        }
    }

    /// Subscribe to snapshot updates
    pub fn subscribe_snapshot(&self) -> watch::Receiver<MeterSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Sender that requests the run loop to stop
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    /// Running consumption total in kWh
    pub fn total_consumption(&self) -> f64 {
        self.total_consumption
    }

    /// Last calendar day folded into the totals
    pub fn last_processed_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    /// Build the current snapshot
    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            ean: self.ean.clone(),
            consumption: self.total_consumption,
            production: self.total_production,
            last_processed_date: self.last_date,
        }
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }

    /// One-time backfill over `[start_date, freshness horizon]`
    ///
    /// Failures are logged and swallowed; a failed backfill leaves the totals
    /// and the processed-date marker untouched.
    pub async fn fetch_initial_data(&mut self) {
        self.fetch_initial_data_as_of(Utc::now().date_naive()).await;
    }

    /// Backfill with an explicit notion of "today"
    pub async fn fetch_initial_data_as_of(&mut self, today: NaiveDate) {
        let safe_date = freshness_horizon(today);

        if self.start_date > safe_date {
            self.logger.warn(&format!(
                "Start date {} is too recent, using {} instead",
                self.start_date, safe_date
            ));
            self.start_date = safe_date;
        }

        match self
            .source
            .consumption_batched(&self.ean, self.start_date, safe_date)
            .await
        {
            Ok(data) => {
                self.logger
                    .info(&format!("Received {} total records from API", data.len()));

                let mut status_counts: HashMap<&str, usize> = HashMap::new();
                for item in &data {
                    *status_counts.entry(item.status.as_str()).or_insert(0) += 1;
                }
                if !status_counts.is_empty() {
                    self.logger
                        .info(&format!("Status distribution: {:?}", status_counts));
                }

                let valid_count = data.iter().filter(|m| m.is_valid()).count();
                self.total_consumption += sum_valid(&data);

                if !data.is_empty() {
                    self.last_date = Some(safe_date);
                }

                self.logger.info(&format!(
                    "Fetched {} records, {} valid ({}), total consumption: {:.2} kWh",
                    data.len(),
                    valid_count,
                    STATUS_VALID,
                    self.total_consumption
                ));
            }
            Err(err) => {
                self.logger
                    .error(&format!("Failed to fetch initial data: {}", err));
            }
        }

        self.publish_snapshot();
    }

    /// Incremental update for the newest day inside the freshness horizon
    ///
    /// Fetches only when the horizon has moved past the last processed date,
    /// so each calendar day is counted exactly once. A failed fetch keeps the
    /// marker where it was; the next cycle retries the same date.
    pub async fn update(&mut self) {
        self.update_as_of(Utc::now().date_naive()).await;
    }

    /// Incremental update with an explicit notion of "today"
    pub async fn update_as_of(&mut self, today: NaiveDate) {
        let safe_date = freshness_horizon(today);

        let due = match self.last_date {
            None => true,
            Some(last) => safe_date > last,
        };
        if !due {
            return;
        }

        match self
            .source
            .consumption(&self.ean, safe_date, safe_date)
            .await
        {
            Ok(data) => {
                let daily_total = sum_valid(&data);
                self.total_consumption += daily_total;
                self.last_date = Some(safe_date);

                self.logger.info(&format!(
                    "Updated consumption: {:.2} kWh (total: {:.2})",
                    daily_total, self.total_consumption
                ));
                self.publish_snapshot();
            }
            Err(err) => {
                self.logger.error(&format!("Failed to fetch data: {}", err));
            }
        }
    }

    /// Run the coordinator: backfill once, then poll on the configured interval
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting meter coordinator");

        self.fetch_initial_data().await;

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the backfill already ran
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.update().await;
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown requested, stopping coordinator");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Sum the valid measurements of a series
///
/// Only records carrying the canonical valid status and a present value are
/// counted; everything else is excluded from billing-grade totals.
pub fn sum_valid(measurements: &[Measurement]) -> f64 {
    measurements
        .iter()
        .filter(|m| m.is_valid())
        .filter_map(|m| m.value)
        .sum()
}
