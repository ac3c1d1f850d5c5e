//! Configuration structures and constants for the lumetric-core library.
//!
//! All tunables for one analysis run are bundled into a single [`RunConfig`]
//! value passed by reference; nothing here is process-global or mutable. The
//! detection thresholds are empirically tuned against representative
//! recordings; change them through configuration, not by editing defaults.

mod builder;

pub use builder::RunConfigBuilder;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// Default constants

/// Default maximum number of decoded frames held by the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default number of frames processed between progress reports and
/// cancellation checks.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Upper bound on decode worker threads; the pool never exceeds the
/// available core count.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default radius of the elliptical kernel used for mask cleanup.
/// Radius 0 disables morphology entirely.
pub const DEFAULT_KERNEL_RADIUS: u32 = 2;

/// Default percentile of background-region lightness used as the
/// representative background level.
pub const DEFAULT_BACKGROUND_PERCENTILE: f32 = 90.0;

/// Default noise floor in L* units; pixels at or below it are excluded.
pub const DEFAULT_NOISE_FLOOR: f32 = 2.0;

/// Percentile of the scanned brightness series treated as the quiescent
/// baseline during range auto-detection.
pub const DEFAULT_BASELINE_PERCENTILE: f32 = 5.0;

/// Margin in L* units added to the baseline to form the detection threshold.
pub const DEFAULT_DETECT_MARGIN: f32 = 5.0;

/// Default completion-beep search band in Hz.
pub const DEFAULT_BEEP_BAND_HZ: (f32, f32) = (800.0, 4000.0);

/// Percentile of band energy used as the beep detection threshold.
pub const DEFAULT_BEEP_PERCENTILE: f32 = 90.0;

/// Shortest burst accepted as a completion beep, in seconds.
pub const DEFAULT_MIN_BEEP_DURATION: f64 = 0.1;

/// Default output scale for plot rasterization (pixels per data unit column).
pub const DEFAULT_PLOT_SCALE: u32 = 2;

/// Pixel-statistics filtering parameters.
///
/// Immutable for the duration of a run; any change invalidates a captured
/// fixed mask (compared structurally by the mask engine).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Morphological kernel radius (0..=7). 0 skips morphology.
    pub kernel_radius: u32,
    /// Background level percentile (50..=99).
    pub background_percentile: f32,
    /// Noise floor in L* units (0..=10).
    pub noise_floor: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kernel_radius: DEFAULT_KERNEL_RADIUS,
            background_percentile: DEFAULT_BACKGROUND_PERCENTILE,
            noise_floor: DEFAULT_NOISE_FLOOR,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.kernel_radius > 7 {
            return Err(CoreError::InvalidConfig(format!(
                "kernel radius {} out of range 0..=7",
                self.kernel_radius
            )));
        }
        if !(50.0..=99.0).contains(&self.background_percentile) {
            return Err(CoreError::InvalidConfig(format!(
                "background percentile {} out of range 50..=99",
                self.background_percentile
            )));
        }
        if !(0.0..=10.0).contains(&self.noise_floor) {
            return Err(CoreError::InvalidConfig(format!(
                "noise floor {} out of range 0..=10",
                self.noise_floor
            )));
        }
        Ok(())
    }
}

/// Frame cache sizing and decode worker pool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached frame count. Must be at least 1.
    pub capacity: usize,
    /// Decode worker threads for prefetch (clamped to available cores).
    pub workers: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(CoreError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective worker pool size: min(configured, available cores).
    pub fn effective_workers(&self) -> usize {
        self.workers.min(num_cpus::get()).max(1)
    }
}

/// Brightness-based range auto-detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Percentile of the brightness series used as the quiescent baseline.
    pub baseline_percentile: f32,
    /// L* margin added to the baseline to form the threshold.
    pub margin: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            baseline_percentile: DEFAULT_BASELINE_PERCENTILE,
            margin: DEFAULT_DETECT_MARGIN,
        }
    }
}

/// Completion-beep detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Inclusive frequency band searched for beeps, in Hz.
    pub band_hz: (f32, f32),
    /// Percentile of band energy used as the detection threshold.
    pub magnitude_percentile: f32,
    /// Shortest accepted beep duration in seconds.
    pub min_beep_duration: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            band_hz: DEFAULT_BEEP_BAND_HZ,
            magnitude_percentile: DEFAULT_BEEP_PERCENTILE,
            min_beep_duration: DEFAULT_MIN_BEEP_DURATION,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.band_hz.0 <= 0.0 || self.band_hz.1 <= self.band_hz.0 {
            return Err(CoreError::InvalidConfig(format!(
                "audio band {:?} is not a valid low..high range",
                self.band_hz
            )));
        }
        if !(0.0..=100.0).contains(&self.magnitude_percentile) {
            return Err(CoreError::InvalidConfig(format!(
                "magnitude percentile {} out of range 0..=100",
                self.magnitude_percentile
            )));
        }
        if self.min_beep_duration < 0.0 {
            return Err(CoreError::InvalidConfig(
                "minimum beep duration must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main configuration structure for the lumetric-core library.
///
/// Typically created by the consumer (lumetric-cli) via [`RunConfigBuilder`]
/// or deserialized from a JSON config file, then passed by reference into the
/// orchestrator and detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Name prefixed to exported CSV/plot files.
    pub analysis_name: String,
    /// Frames per orchestrator batch (progress + cancellation granularity).
    pub batch_size: usize,
    pub cache: CacheConfig,
    pub filter: FilterConfig,
    pub detection: DetectionConfig,
    pub audio: AudioConfig,
    /// Plot rasterization scale (pixels per frame column).
    pub plot_scale: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            analysis_name: "analysis".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            cache: CacheConfig::default(),
            filter: FilterConfig::default(),
            detection: DetectionConfig::default(),
            audio: AudioConfig::default(),
            plot_scale: DEFAULT_PLOT_SCALE,
        }
    }
}

impl RunConfig {
    /// Validates every sub-section. Called once before a run starts; a
    /// failure here means no frame is ever decoded.
    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.analysis_name.is_empty() {
            return Err(CoreError::InvalidConfig(
                "analysis name must not be empty".to_string(),
            ));
        }
        self.cache.validate()?;
        self.filter.validate()?;
        self.audio.validate()?;
        Ok(())
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &std::path::Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| CoreError::InvalidConfig(format!("config parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration to a JSON file (pretty-printed).
    pub fn to_json_file(&self, path: &std::path::Path) -> CoreResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::InvalidConfig(format!("config serialize failed: {e}")))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
