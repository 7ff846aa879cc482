//! Analysis diagnostics: timing, counts, and degeneracy flags per stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning and bottleneck hunting. They are collected by
//! [`analyze_with_diagnostics`](crate::analyze_with_diagnostics) and
//! printed by the CLI; nothing in the pipeline reads them back.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits. Timing is injected through the [`Clock`] trait so the pure
//! pipeline never reads wall time on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of elapsed-time measurements.
///
/// Callers that want timings pass a clock; the pipeline itself never
/// reads wall time. [`InstantClock`] is the obvious native choice;
/// tests can supply a fixed or scripted clock.
pub trait Clock {
    /// Duration elapsed since `self` was told to start measuring the
    /// current span.
    fn elapsed(&mut self) -> Duration;

    /// Begin a new measurement span.
    fn restart(&mut self);
}

/// [`Clock`] backed by `std::time::Instant`.
#[derive(Debug)]
pub struct InstantClock(std::time::Instant);

impl InstantClock {
    /// Create a clock starting now.
    #[must_use]
    pub fn new() -> Self {
        Self(std::time::Instant::now())
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn elapsed(&mut self) -> Duration {
        self.0.elapsed()
    }

    fn restart(&mut self) {
        self.0 = std::time::Instant::now();
    }
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Preprocessing (downscale + luminance) metrics.
    Preprocess {
        /// Processing-frame width in pixels.
        width: u32,
        /// Processing-frame height in pixels.
        height: u32,
        /// Whether the input was actually downscaled.
        downscaled: bool,
    },
    /// Depth estimation metrics.
    DepthEstimation {
        /// Maximum observed gradient magnitude before normalization.
        max_gradient: f32,
        /// Whether the epsilon-guarded uniform fallback was taken.
        degenerate_fallback: bool,
        /// Smoothing block side length.
        smoothing_block: u32,
    },
    /// Region segmentation metrics.
    Segmentation {
        /// Requested bucket count.
        requested_regions: u32,
        /// Regions actually emitted (empty buckets omitted).
        emitted_regions: usize,
    },
    /// Depth visualization rendering metrics.
    Render {
        /// Encoded payload size in bytes.
        payload_bytes: usize,
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
    },
}

/// Diagnostics collected from one full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: preprocessing to the luminance frame.
    pub preprocess: StageDiagnostics,
    /// Stage 2: depth-proxy estimation.
    pub depth_estimation: StageDiagnostics,
    /// Stage 3: focus-region segmentation.
    pub segmentation: StageDiagnostics,
    /// Stage 4: depth visualization rendering.
    pub render: StageDiagnostics,
    /// Total wall-clock duration of the analysis (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}
