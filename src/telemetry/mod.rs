// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry, tracing, and metrics infrastructure.
//!
//! - **Tracing**: structured logging with spans around resolution, cache
//!   rebuilds, backend calls and environment switches
//! - **Metrics**: backend call outcomes, retry counts and operation latencies
//!
//! # Usage
//!
//! Initialize telemetry once in the host process:
//!
//! ```rust,ignore
//! use obscode::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Metric recording is compiled in with the `telemetry` feature (on by default).

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{BackendCallMetrics, Histogram, Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS};
