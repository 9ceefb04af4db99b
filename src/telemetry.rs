//! Structured diagnostics pipeline.
//!
//! Divergence reports, rejected packets and clamped prediction windows are
//! structured data rather than bare log lines. They can be:
//!
//! - Logged via tracing (default behavior)
//! - Collected programmatically for testing
//! - Sent to custom observers (metrics, diagnostics overlays, etc.)
//!
//! # Example
//!
//! ```
//! use ticwire::telemetry::{CollectingObserver, DiagnosticKind};
//! use std::sync::Arc;
//!
//! // Create a collecting observer for tests
//! let observer = Arc::new(CollectingObserver::new());
//!
//! // Check diagnostics after some operations
//! assert!(!observer.has_diagnostic(DiagnosticKind::Divergence));
//! ```

use crate::Tic;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Severity of a diagnostic.
///
/// Severities are ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    /// Expected under normal operation, recorded for visibility.
    ///
    /// Example: the prediction window was clamped to its maximum.
    Info,
    /// Unexpected but recoverable; the offending input was discarded.
    ///
    /// Example: a malformed packet was dropped.
    Warning,
    /// The session is no longer trustworthy.
    ///
    /// Example: two peers computed different states for the same tic.
    Error,
}

impl DiagnosticSeverity {
    /// Returns a string representation suitable for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// A peer's state disagrees with ours at a matching tic.
    Divergence,
    /// A received buffer failed to decode.
    MalformedPacket,
    /// A packet did not fit the codec's scratch buffer.
    EncodeOverflow,
    /// Raw prediction exceeded the configured maximum.
    PredictionClamped,
    /// A configuration value was refused.
    Configuration,
}

impl DiagnosticKind {
    /// Returns a string representation suitable for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Divergence => "divergence",
            Self::MalformedPacket => "malformed_packet",
            Self::EncodeOverflow => "encode_overflow",
            Self::PredictionClamped => "prediction_clamped",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured diagnostic.
///
/// # Example
///
/// ```
/// use ticwire::telemetry::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
/// use ticwire::Tic;
///
/// let diagnostic = Diagnostic::new(
///     DiagnosticSeverity::Error,
///     DiagnosticKind::Divergence,
///     "seed mismatch",
///     "verify.rs:10",
/// )
/// .with_tic(Tic::new(100))
/// .with_context("from", "2");
///
/// assert_eq!(diagnostic.tic, Some(Tic::new(100)));
/// assert!(diagnostic.to_string().contains("tic=100"));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    /// The severity level.
    pub severity: DiagnosticSeverity,
    /// The category.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
    /// Source location where the diagnostic was raised (file:line).
    pub location: &'static str,
    /// The tic the diagnostic refers to, if any.
    pub tic: Option<Tic>,
    /// Additional structured context as key-value pairs.
    pub context: BTreeMap<String, String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(
        severity: DiagnosticSeverity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            tic: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the tic this diagnostic refers to.
    #[must_use]
    pub fn with_tic(mut self, tic: Tic) -> Self {
        self.tic = Some(tic);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this diagnostic to a JSON string.
    ///
    /// Returns `None` if serialization fails.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes this diagnostic to a pretty-printed JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(tic) = self.tic {
            write!(f, ", tic={tic}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing diagnostics.
///
/// # Thread Safety
///
/// When the `sync-send` feature is enabled, observers must be `Send + Sync`.
///
/// # Example
///
/// ```
/// use ticwire::telemetry::{Diagnostic, DiagnosticObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingObserver {
///     seen: AtomicUsize,
/// }
///
/// impl DiagnosticObserver for CountingObserver {
///     fn on_diagnostic(&self, _diagnostic: &Diagnostic) {
///         self.seen.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait DiagnosticObserver: Send + Sync {
    /// Called for every diagnostic. Runs on the caller's thread; keep it quick.
    fn on_diagnostic(&self, diagnostic: &Diagnostic);
}

#[cfg(not(feature = "sync-send"))]
/// Trait for observing diagnostics.
///
/// Implement this trait to forward diagnostics to logging, metrics or an
/// on-screen overlay.
pub trait DiagnosticObserver {
    /// Called for every diagnostic.
    fn on_diagnostic(&self, diagnostic: &Diagnostic);
}

/// Built-in observer that logs diagnostics via the `tracing` crate.
///
/// # Log Levels
///
/// - `Info` severity → `tracing::info!`
/// - `Warning` severity → `tracing::warn!`
/// - `Error` severity → `tracing::error!`
///
/// `severity`, `kind`, `location`, `tic` and `context` are emitted as
/// structured fields.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn format_tic(tic: Option<Tic>) -> String {
        match tic {
            None => "null".to_owned(),
            Some(t) => t.to_string(),
        }
    }
}

impl DiagnosticObserver for TracingObserver {
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        let severity = diagnostic.severity.as_str();
        let kind = diagnostic.kind.as_str();
        let location = diagnostic.location;
        let tic_str = Self::format_tic(diagnostic.tic);

        let context_str = if diagnostic.context.is_empty() {
            "{}".to_owned()
        } else {
            let pairs: Vec<String> = diagnostic
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match diagnostic.severity {
            DiagnosticSeverity::Info => {
                tracing::info!(
                    severity,
                    kind,
                    location,
                    tic = %tic_str,
                    context = %context_str,
                    "{}",
                    diagnostic.message
                );
            },
            DiagnosticSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    tic = %tic_str,
                    context = %context_str,
                    "{}",
                    diagnostic.message
                );
            },
            DiagnosticSeverity::Error => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    tic = %tic_str,
                    context = %context_str,
                    "{}",
                    diagnostic.message
                );
            },
        }
    }
}

/// Built-in observer that collects diagnostics for testing.
///
/// # Example
///
/// ```
/// use ticwire::telemetry::{
///     CollectingObserver, Diagnostic, DiagnosticKind, DiagnosticObserver, DiagnosticSeverity,
/// };
///
/// let observer = CollectingObserver::new();
/// observer.on_diagnostic(&Diagnostic::new(
///     DiagnosticSeverity::Warning,
///     DiagnosticKind::MalformedPacket,
///     "truncated",
///     "test.rs:1",
/// ));
///
/// assert_eq!(observer.len(), 1);
/// assert!(observer.has_diagnostic(DiagnosticKind::MalformedPacket));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Returns the number of collected diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Checks if any diagnostic of the specified kind has been collected.
    #[must_use]
    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.lock().iter().any(|d| d.kind == kind)
    }

    /// Checks if any diagnostic with the specified severity has been collected.
    #[must_use]
    pub fn has_severity(&self, severity: DiagnosticSeverity) -> bool {
        self.diagnostics
            .lock()
            .iter()
            .any(|d| d.severity == severity)
    }

    /// Returns all diagnostics of the specified kind.
    #[must_use]
    pub fn diagnostics_of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns all diagnostics at or above the specified severity.
    #[must_use]
    pub fn diagnostics_at_severity(&self, min_severity: DiagnosticSeverity) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.severity >= min_severity)
            .cloned()
            .collect()
    }

    /// Clears all collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticObserver for CollectingObserver {
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().push(diagnostic.clone());
    }
}

/// Forwards diagnostics to several observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn DiagnosticObserver>>,
}

impl CompositeObserver {
    /// Creates a new composite observer with no child observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer to the composite.
    pub fn add(&mut self, observer: Arc<dyn DiagnosticObserver>) {
        self.observers.push(observer);
    }

    /// Creates a composite observer from a list of observers.
    #[must_use]
    pub fn from_observers(observers: Vec<Arc<dyn DiagnosticObserver>>) -> Self {
        Self { observers }
    }
}

impl DiagnosticObserver for CompositeObserver {
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        for observer in &self.observers {
            observer.on_diagnostic(diagnostic);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

/// Reports a diagnostic with location tracking to the [`TracingObserver`].
///
/// # Syntax
///
/// ```text
/// report_diagnostic!(severity, kind, "message");
/// report_diagnostic!(severity, kind, "message with {}", format_args);
/// ```
///
/// # Example
///
/// ```
/// use ticwire::{report_diagnostic, telemetry::{DiagnosticKind, DiagnosticSeverity}};
///
/// report_diagnostic!(DiagnosticSeverity::Warning, DiagnosticKind::MalformedPacket,
///     "dropped packet of {} bytes", 3);
/// ```
#[macro_export]
macro_rules! report_diagnostic {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::DiagnosticObserver as _;
        let diagnostic = $crate::telemetry::Diagnostic::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_diagnostic(&diagnostic);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::DiagnosticObserver as _;
        let diagnostic = $crate::telemetry::Diagnostic::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_diagnostic(&diagnostic);
    }};
}

/// Asserts that no diagnostics have been collected.
///
/// # Panics
///
/// Panics if the observer contains any diagnostics, printing them for debugging.
///
/// # Example
///
/// ```
/// use ticwire::{assert_no_diagnostics, telemetry::CollectingObserver};
///
/// let observer = CollectingObserver::new();
/// assert_no_diagnostics!(observer);
/// ```
#[macro_export]
macro_rules! assert_no_diagnostics {
    ($observer:expr) => {{
        let diagnostics = $observer.diagnostics();
        assert!(
            diagnostics.is_empty(),
            "Expected no diagnostics, but found {}:\n{:#?}",
            diagnostics.len(),
            diagnostics
        );
    }};

    ($observer:expr, $msg:expr) => {{
        let diagnostics = $observer.diagnostics();
        assert!(
            diagnostics.is_empty(),
            "{}\nExpected no diagnostics, but found {}:\n{:#?}",
            $msg,
            diagnostics.len(),
            diagnostics
        );
    }};
}

/// Asserts that a diagnostic of the specified kind was collected.
///
/// # Panics
///
/// Panics if no diagnostic of the specified kind was found.
///
/// # Example
///
/// ```
/// use ticwire::{assert_diagnostic, telemetry::{
///     CollectingObserver, Diagnostic, DiagnosticKind, DiagnosticObserver, DiagnosticSeverity,
/// }};
///
/// let observer = CollectingObserver::new();
/// observer.on_diagnostic(&Diagnostic::new(
///     DiagnosticSeverity::Error,
///     DiagnosticKind::Divergence,
///     "seed mismatch",
///     "test.rs:1",
/// ));
/// assert_diagnostic!(observer, DiagnosticKind::Divergence);
/// ```
#[macro_export]
macro_rules! assert_diagnostic {
    ($observer:expr, $kind:expr) => {{
        assert!(
            $observer.has_diagnostic($kind),
            "Expected diagnostic of kind {:?}, but found: {:#?}",
            $kind,
            $observer.diagnostics()
        );
    }};

    ($observer:expr, $kind:expr, $msg:expr) => {{
        assert!(
            $observer.has_diagnostic($kind),
            "{}\nExpected diagnostic of kind {:?}, but found: {:#?}",
            $msg,
            $kind,
            $observer.diagnostics()
        );
    }};
}

/// Reports a diagnostic to an optional observer, falling back to [`TracingObserver`] if `None`.
///
/// # Example
///
/// ```
/// use ticwire::telemetry::{
///     report_to_observer, CollectingObserver, Diagnostic, DiagnosticKind, DiagnosticSeverity,
/// };
/// use std::sync::Arc;
///
/// let observer = Arc::new(CollectingObserver::new());
/// let diagnostic = Diagnostic::new(
///     DiagnosticSeverity::Info,
///     DiagnosticKind::PredictionClamped,
///     "clamped",
///     "test.rs:1",
/// );
///
/// report_to_observer(Some(&observer), &diagnostic);
/// assert_eq!(observer.len(), 1);
///
/// report_to_observer(None::<&Arc<CollectingObserver>>, &diagnostic);
/// ```
pub fn report_to_observer<O: DiagnosticObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    diagnostic: &Diagnostic,
) {
    match observer {
        Some(obs) => obs.on_diagnostic(diagnostic),
        None => TracingObserver.on_diagnostic(diagnostic),
    }
}

/// Reports a diagnostic through an optional observer.
///
/// Like [`report_diagnostic!`], but the first argument is an
/// `Option<Arc<dyn DiagnosticObserver>>`; `None` falls back to the
/// [`TracingObserver`].
///
/// # Example
///
/// ```
/// use ticwire::{report_diagnostic_to, telemetry::{
///     CollectingObserver, DiagnosticKind, DiagnosticObserver, DiagnosticSeverity,
/// }};
/// use std::sync::Arc;
///
/// let observer: Option<Arc<dyn DiagnosticObserver>> = Some(Arc::new(CollectingObserver::new()));
///
/// report_diagnostic_to!(&observer, DiagnosticSeverity::Warning, DiagnosticKind::MalformedPacket,
///     "truncated packet: {} of {} words", 3, 7);
/// ```
#[macro_export]
macro_rules! report_diagnostic_to {
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        let diagnostic = $crate::telemetry::Diagnostic::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &diagnostic);
    }};

    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        let diagnostic = $crate::telemetry::Diagnostic::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &diagnostic);
    }};
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

    fn diagnostic(severity: DiagnosticSeverity, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic::new(severity, kind, "test", "test.rs:1")
    }

    #[test]
    fn test_severity_ordering() {
        assert!(DiagnosticSeverity::Info < DiagnosticSeverity::Warning);
        assert!(DiagnosticSeverity::Warning < DiagnosticSeverity::Error);
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(DiagnosticKind::Divergence.as_str(), "divergence");
        assert_eq!(DiagnosticKind::MalformedPacket.as_str(), "malformed_packet");
        assert_eq!(
            DiagnosticKind::PredictionClamped.to_string(),
            "prediction_clamped"
        );
    }

    #[test]
    fn test_display() {
        let d = diagnostic(DiagnosticSeverity::Error, DiagnosticKind::Divergence)
            .with_tic(Tic::new(9))
            .with_context("field", "hp");
        let text = d.to_string();
        assert!(text.starts_with("[error/divergence] test (at test.rs:1"));
        assert!(text.contains("tic=9"));
        assert!(text.contains("field"));
    }

    #[test]
    fn test_collecting_observer_filters() {
        let observer = CollectingObserver::new();
        observer.on_diagnostic(&diagnostic(
            DiagnosticSeverity::Info,
            DiagnosticKind::PredictionClamped,
        ));
        observer.on_diagnostic(&diagnostic(
            DiagnosticSeverity::Error,
            DiagnosticKind::Divergence,
        ));
        observer.on_diagnostic(&diagnostic(
            DiagnosticSeverity::Warning,
            DiagnosticKind::MalformedPacket,
        ));

        assert_eq!(observer.len(), 3);
        assert!(observer.has_severity(DiagnosticSeverity::Info));
        assert_eq!(
            observer
                .diagnostics_of_kind(DiagnosticKind::Divergence)
                .len(),
            1
        );
        assert_eq!(
            observer
                .diagnostics_at_severity(DiagnosticSeverity::Warning)
                .len(),
            2
        );

        observer.clear();
        assert!(observer.is_empty());
        assert_no_diagnostics!(observer);
    }

    #[test]
    fn test_collecting_observer_concurrent_writes() {
        let observer = Arc::new(CollectingObserver::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let observer = Arc::clone(&observer);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        observer.on_diagnostic(&diagnostic(
                            DiagnosticSeverity::Warning,
                            DiagnosticKind::MalformedPacket,
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(observer.len(), 100);
    }

    #[test]
    fn test_composite_observer() {
        let first = Arc::new(CollectingObserver::new());
        let second = Arc::new(CollectingObserver::new());
        let mut composite = CompositeObserver::new();
        composite.add(first.clone());
        composite.add(second.clone());

        composite.on_diagnostic(&diagnostic(
            DiagnosticSeverity::Error,
            DiagnosticKind::EncodeOverflow,
        ));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(format!("{composite:?}").contains("num_observers: 2"));
    }

    #[test]
    fn test_report_diagnostic_macros() {
        report_diagnostic!(
            DiagnosticSeverity::Info,
            DiagnosticKind::Configuration,
            "plain"
        );
        report_diagnostic!(
            DiagnosticSeverity::Warning,
            DiagnosticKind::MalformedPacket,
            "with {} args",
            2
        );

        let collector = Arc::new(CollectingObserver::new());
        let observer: Option<Arc<dyn DiagnosticObserver>> = Some(collector.clone());
        report_diagnostic_to!(
            &observer,
            DiagnosticSeverity::Warning,
            DiagnosticKind::MalformedPacket,
            "dropped {} bytes",
            12
        );
        assert_diagnostic!(collector, DiagnosticKind::MalformedPacket);
        assert_eq!(collector.diagnostics()[0].message, "dropped 12 bytes");
        assert!(collector.diagnostics()[0].location.contains("telemetry.rs"));

        let none: Option<Arc<dyn DiagnosticObserver>> = None;
        report_diagnostic_to!(
            &none,
            DiagnosticSeverity::Info,
            DiagnosticKind::Configuration,
            "falls back to tracing"
        );
    }

    #[test]
    fn test_tracing_observer_with_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            for severity in [
                DiagnosticSeverity::Info,
                DiagnosticSeverity::Warning,
                DiagnosticSeverity::Error,
            ] {
                TracingObserver::new().on_diagnostic(
                    &diagnostic(severity, DiagnosticKind::Divergence).with_context("k", "v"),
                );
            }
        });
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_to_json() {
        let json = diagnostic(DiagnosticSeverity::Warning, DiagnosticKind::MalformedPacket)
            .with_tic(Tic::new(42))
            .to_json()
            .unwrap();
        assert!(json.contains(r#""severity":"warning""#));
        assert!(json.contains(r#""kind":"malformed_packet""#));
        assert!(json.contains(r#""tic":42"#));
    }
}
