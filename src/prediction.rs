//! Bounds how far a client simulates past the last confirmed tic.
//!
//! A client renders frames faster than authoritative tics arrive. Between
//! confirmations it predicts by running the simulation ahead, one tic per
//! `1 / net_frequency` seconds of wall-clock time since the last confirmation,
//! but never more than `max_prediction_tics`. When the limit is reached the
//! caller degrades prediction rather than freezing.
//!
//! # Example
//!
//! ```
//! use ticwire::{compute_ahead_tics, PredictionConfig, PredictionWindow};
//!
//! assert_eq!(compute_ahead_tics(11.0, 10.0, 30, 8), 8);
//! assert_eq!(compute_ahead_tics(0.1, 0.0, 30, 8), 3);
//!
//! let window = PredictionWindow::new(PredictionConfig::default())?;
//! let ahead = window.evaluate(11.0, 10.0);
//! assert_eq!((ahead.raw, ahead.permitted), (30, 8));
//! assert!(ahead.is_clamped());
//! # Ok::<(), ticwire::TicwireError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use web_time::{Duration, Instant};

use crate::config::PredictionConfig;
use crate::report_diagnostic_to;
use crate::telemetry::{DiagnosticKind, DiagnosticObserver, DiagnosticSeverity};
use crate::Result;

/// Number of tics a client may run ahead of its last confirmed tic.
///
/// `ahead = floor((last_frame_ts - last_confirmed_ts) * net_frequency)`,
/// clamped to `0..=max_prediction_tics`. Timestamps are in seconds. An
/// infinite difference saturates before clamping, so a client that never
/// confirmed is fully clamped; a NaN difference yields 0.
#[must_use]
pub fn compute_ahead_tics(
    last_frame_ts: f64,
    last_confirmed_ts: f64,
    net_frequency: u32,
    max_prediction_tics: u32,
) -> u32 {
    let raw = raw_ahead(last_frame_ts - last_confirmed_ts, net_frequency);
    clamp_ahead(raw, max_prediction_tics)
}

#[allow(clippy::cast_possible_truncation)]
fn raw_ahead(elapsed_secs: f64, net_frequency: u32) -> i64 {
    let ahead = (elapsed_secs * f64::from(net_frequency)).floor();
    if ahead.is_nan() {
        0
    } else {
        // saturating float-to-int cast, infinities included
        ahead as i64
    }
}

fn clamp_ahead(raw: i64, max_prediction_tics: u32) -> u32 {
    u32::try_from(raw.clamp(0, i64::from(max_prediction_tics))).unwrap_or(0)
}

/// Result of one prediction window evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AheadTics {
    /// Tics elapsed since confirmation before clamping. Negative when the
    /// frame timestamp precedes the confirmation.
    pub raw: i64,
    /// Tics the client may simulate ahead.
    pub permitted: u32,
}

impl AheadTics {
    /// Whether the window limited the raw value from above.
    #[must_use]
    pub fn is_clamped(&self) -> bool {
        self.raw > i64::from(self.permitted)
    }

    /// Whether any tic is predicted.
    #[must_use]
    pub const fn is_predicting(&self) -> bool {
        self.permitted > 0
    }
}

impl fmt::Display for AheadTics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ahead", self.permitted)?;
        if self.is_clamped() {
            write!(f, " (clamped from {})", self.raw)?;
        }
        Ok(())
    }
}

/// Prediction window for a fixed tic rate and limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionWindow {
    config: PredictionConfig,
}

impl PredictionWindow {
    /// Creates a window from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TicwireError::InvalidConfig`](crate::TicwireError::InvalidConfig)
    /// if `config.net_frequency` is zero.
    pub fn new(config: PredictionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration of this window.
    #[must_use]
    pub const fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Evaluates the window for two timestamps in seconds.
    #[must_use]
    pub fn evaluate(&self, last_frame_ts: f64, last_confirmed_ts: f64) -> AheadTics {
        self.from_raw(raw_ahead(
            last_frame_ts - last_confirmed_ts,
            self.config.net_frequency,
        ))
    }

    /// Evaluates the window for the time elapsed since confirmation.
    #[must_use]
    pub fn ahead_for_elapsed(&self, elapsed: Duration) -> AheadTics {
        self.from_raw(raw_ahead(elapsed.as_secs_f64(), self.config.net_frequency))
    }

    fn from_raw(&self, raw: i64) -> AheadTics {
        AheadTics {
            raw,
            permitted: clamp_ahead(raw, self.config.max_prediction_tics),
        }
    }
}

/// Wall-clock driver for a [`PredictionWindow`].
///
/// Call [`confirm`](Self::confirm) whenever an authoritative tic arrives and
/// [`ahead_tics`](Self::ahead_tics) once per rendered frame. Entering the
/// clamped state emits one `PredictionClamped` diagnostic; staying clamped
/// emits nothing further until the clock recovers.
pub struct PredictionClock {
    window: PredictionWindow,
    last_confirmed: Instant,
    clamped: bool,
    observer: Option<Arc<dyn DiagnosticObserver>>,
}

impl fmt::Debug for PredictionClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionClock")
            .field("window", &self.window)
            .field("last_confirmed", &self.last_confirmed)
            .field("clamped", &self.clamped)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl PredictionClock {
    /// Creates a clock confirmed at the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`TicwireError::InvalidConfig`](crate::TicwireError::InvalidConfig)
    /// if the configuration is invalid.
    pub fn new(config: PredictionConfig) -> Result<Self> {
        Ok(Self::with_window(PredictionWindow::new(config)?, Instant::now()))
    }

    /// Creates a clock over `window` last confirmed at `confirmed_at`.
    #[must_use]
    pub fn with_window(window: PredictionWindow, confirmed_at: Instant) -> Self {
        Self {
            window,
            last_confirmed: confirmed_at,
            clamped: false,
            observer: None,
        }
    }

    /// Sends clamp diagnostics to `observer` instead of the tracing observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DiagnosticObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The window this clock evaluates.
    #[must_use]
    pub const fn window(&self) -> &PredictionWindow {
        &self.window
    }

    /// Instant of the last confirmation.
    #[must_use]
    pub const fn last_confirmed(&self) -> Instant {
        self.last_confirmed
    }

    /// Records that an authoritative tic arrived now.
    pub fn confirm(&mut self) {
        self.confirm_at(Instant::now());
    }

    /// Records that an authoritative tic arrived at `at`.
    pub fn confirm_at(&mut self, at: Instant) {
        self.last_confirmed = at;
        if self.clamped {
            tracing::trace!("prediction window recovered");
        }
        self.clamped = false;
    }

    /// Tics permitted ahead as of now.
    pub fn ahead_tics(&mut self) -> AheadTics {
        self.ahead_tics_at(Instant::now())
    }

    /// Tics permitted ahead as of `now`.
    pub fn ahead_tics_at(&mut self, now: Instant) -> AheadTics {
        let elapsed = now.saturating_duration_since(self.last_confirmed);
        let ahead = self.window.ahead_for_elapsed(elapsed);
        let clamped = ahead.is_clamped();
        if clamped && !self.clamped {
            report_diagnostic_to!(
                self.observer,
                DiagnosticSeverity::Info,
                DiagnosticKind::PredictionClamped,
                "prediction clamped to {} tics after {:?} without confirmation",
                ahead.permitted,
                elapsed
            );
        }
        self.clamped = clamped;
        ahead
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::ConfigReason;
    use crate::telemetry::CollectingObserver;
    use crate::TicwireError;

    #[test]
    fn test_clamps_to_max() {
        assert_eq!(compute_ahead_tics(1.0, 0.0, 30, 8), 8);
        assert_eq!(compute_ahead_tics(5.0, 5.0, 30, 8), 0);
    }

    #[test]
    fn test_floors_partial_tics() {
        // 0.2 s at 30 Hz is 6 tics; 0.19 s is 5.7
        assert_eq!(compute_ahead_tics(0.2, 0.0, 30, 8), 6);
        assert_eq!(compute_ahead_tics(0.19, 0.0, 30, 8), 5);
    }

    #[test]
    fn test_negative_elapsed_is_zero() {
        assert_eq!(compute_ahead_tics(0.0, 1.0, 30, 8), 0);
    }

    #[test]
    fn test_nan_is_zero() {
        assert_eq!(compute_ahead_tics(f64::NAN, 0.0, 30, 8), 0);
        assert_eq!(compute_ahead_tics(f64::INFINITY, f64::INFINITY, 30, 8), 0);
    }

    #[test]
    fn test_infinite_elapsed_saturates() {
        assert_eq!(compute_ahead_tics(f64::INFINITY, 0.0, 30, 8), 8);
        assert_eq!(compute_ahead_tics(1.0, f64::NEG_INFINITY, 30, 8), 8);
        assert_eq!(compute_ahead_tics(1e300, 0.0, 30, 8), 8);
        assert_eq!(compute_ahead_tics(f64::NEG_INFINITY, 0.0, 30, 8), 0);

        let window = PredictionWindow::new(PredictionConfig::default()).unwrap();
        let never_confirmed = window.evaluate(3.5, f64::NEG_INFINITY);
        assert_eq!(never_confirmed.raw, i64::MAX);
        assert_eq!(never_confirmed.permitted, 8);
        assert!(never_confirmed.is_clamped());
        assert_eq!(window.evaluate(f64::NEG_INFINITY, 0.0).raw, i64::MIN);
    }

    #[test]
    fn test_zero_max_disables_prediction() {
        assert_eq!(compute_ahead_tics(10.0, 0.0, 30, 0), 0);
    }

    #[test]
    fn test_evaluate_reports_raw() {
        let window = PredictionWindow::new(PredictionConfig::default()).unwrap();
        let ahead = window.evaluate(1.0, 0.0);
        assert_eq!(ahead, AheadTics { raw: 30, permitted: 8 });
        assert!(ahead.is_clamped());
        assert!(ahead.is_predicting());
        assert_eq!(ahead.to_string(), "8 ahead (clamped from 30)");

        let ahead = window.evaluate(-1.0, 0.0);
        assert_eq!(ahead.raw, -30);
        assert!(!ahead.is_clamped());
        assert!(!ahead.is_predicting());
    }

    #[test]
    fn test_ahead_for_elapsed() {
        let window = PredictionWindow::new(PredictionConfig::lan()).unwrap();
        assert_eq!(window.ahead_for_elapsed(Duration::from_millis(66)).permitted, 1);
        assert_eq!(window.ahead_for_elapsed(Duration::from_millis(70)).permitted, 2);
        assert_eq!(window.ahead_for_elapsed(Duration::from_secs(3)).permitted, 3);
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let config = PredictionConfig {
            net_frequency: 0,
            ..PredictionConfig::default()
        };
        assert!(matches!(
            PredictionWindow::new(config),
            Err(TicwireError::InvalidConfig {
                reason: ConfigReason::ZeroNetFrequency
            })
        ));
    }

    #[test]
    fn test_clock_reports_clamp_once() {
        let observer = Arc::new(CollectingObserver::new());
        let window = PredictionWindow::new(PredictionConfig::default()).unwrap();
        let start = Instant::now();
        let mut clock = PredictionClock::with_window(window, start).with_observer(observer.clone());

        assert_eq!(clock.ahead_tics_at(start + Duration::from_millis(100)).permitted, 3);
        assert!(observer.is_empty());

        assert!(clock.ahead_tics_at(start + Duration::from_secs(1)).is_clamped());
        assert!(clock.ahead_tics_at(start + Duration::from_secs(2)).is_clamped());
        assert_eq!(observer.diagnostics_of_kind(DiagnosticKind::PredictionClamped).len(), 1);

        clock.confirm_at(start + Duration::from_secs(2));
        assert_eq!(clock.ahead_tics_at(start + Duration::from_secs(2)).permitted, 0);
        assert!(clock.ahead_tics_at(start + Duration::from_secs(4)).is_clamped());
        assert_eq!(observer.len(), 2);
    }

    #[test]
    fn test_clock_before_confirmation_is_zero() {
        let window = PredictionWindow::new(PredictionConfig::default()).unwrap();
        let start = Instant::now();
        let later = start + Duration::from_secs(1);
        let mut clock = PredictionClock::with_window(window, later);
        assert_eq!(clock.ahead_tics_at(start).permitted, 0);
    }
}
