// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber installation for hosts that do not bring their own.

use std::io;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directive variable, consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "OBSCODE_LOG";

/// How the engine's own log output is produced.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level applied when neither `filter` nor the environment sets one.
    pub level: Level,
    /// Explicit directive such as `obscode::document=debug`. Wins over the
    /// environment.
    pub filter: Option<String>,
    /// Emit a close event with busy/idle timings for every span
    /// (rebuilds, environment switches).
    pub span_timings: bool,
    /// Prefix events with `file:line`.
    pub source_locations: bool,
    pub ansi: bool,
    /// Log the metrics report when the guard is dropped.
    pub report_metrics_on_exit: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            filter: None,
            span_timings: false,
            source_locations: false,
            ansi: false,
            report_metrics_on_exit: false,
        }
    }
}

impl TelemetryConfig {
    /// Debug output with span timings and the metrics report on exit.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            span_timings: true,
            source_locations: true,
            ansi: true,
            report_metrics_on_exit: true,
            ..Self::default()
        }
    }

    /// Failure episodes and worse.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            ..Self::default()
        }
    }

    /// Everything this crate emits, nothing from dependencies.
    pub fn testing() -> Self {
        Self {
            level: Level::TRACE,
            filter: Some("obscode=trace".to_string()),
            span_timings: true,
            source_locations: true,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Resolve the filter: explicit directive, then `OBSCODE_LOG`, then
    /// `RUST_LOG`, then `level`. An unparsable directive falls back to `level`.
    fn env_filter(&self) -> EnvFilter {
        let by_level = || EnvFilter::new(self.level.as_str());
        if let Some(directive) = &self.filter {
            return EnvFilter::try_new(directive).unwrap_or_else(|_| by_level());
        }
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| by_level())
    }
}

/// Returned by [`init_telemetry`]. Keep it alive for the process lifetime.
pub struct TelemetryGuard {
    report_metrics: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if self.report_metrics {
            let report = super::metrics::GLOBAL_METRICS.snapshot().format_report();
            tracing::info!(target: "obscode::metrics", "\n{}", report);
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = self.report_metrics;
    }
}

/// Install a stderr subscriber.
///
/// Fails when the process already has a global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations)
        .with_span_events(if config.span_timings {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .compact();

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(TelemetryGuard {
        report_metrics: config.report_metrics_on_exit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = TelemetryConfig::default();
        assert_eq!(default.level, Level::INFO);
        assert!(default.filter.is_none());
        assert!(!default.report_metrics_on_exit);

        let dev = TelemetryConfig::development();
        assert_eq!(dev.level, Level::DEBUG);
        assert!(dev.span_timings && dev.report_metrics_on_exit);

        assert_eq!(TelemetryConfig::production().level, Level::WARN);
        assert_eq!(TelemetryConfig::testing().filter.as_deref(), Some("obscode=trace"));
    }

    #[test]
    fn test_with_overrides() {
        let config = TelemetryConfig::production()
            .with_level(Level::DEBUG)
            .with_filter("obscode::providers=debug");
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.filter.as_deref(), Some("obscode::providers=debug"));
        assert!(!config.ansi);
    }

    #[test]
    fn test_explicit_filter_wins() {
        let config = TelemetryConfig::default().with_filter("obscode::document=trace");
        assert_eq!(config.env_filter().to_string(), "obscode::document=trace");
    }
}
