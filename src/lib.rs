//! # Metron - cumulative energy readings from the EGD Distribuce24 API
//!
//! A Rust daemon that polls the distributor's metering API on a schedule,
//! converts raw quarter-hour power readings into cumulative energy totals,
//! and exposes them as consumption/production readings over a small REST
//! surface.
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of
//! concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `egd`: Metering API client (OAuth2, pagination, month batching)
//! - `coordinator`: Accumulation state machine and polling loop
//! - `registry`: Running-instance registry owned by the composition root
//! - `web`: HTTP server exposing the current snapshot

pub mod config;
pub mod coordinator;
pub mod egd;
pub mod error;
pub mod logging;
pub mod registry;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{MeterCoordinator, MeterSnapshot};
pub use egd::EgdClient;
pub use error::{MetronError, Result};
