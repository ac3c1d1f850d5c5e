//! Builder pattern for [`RunConfig`].
//!
//! Provides a fluent API for assembling a run configuration from CLI
//! arguments or embedding code, with defaults for everything not set.

use super::{AudioConfig, CacheConfig, DetectionConfig, FilterConfig, RunConfig};

/// Builder for creating [`RunConfig`] instances.
///
/// # Examples
///
/// ```rust
/// use lumetric_core::config::RunConfigBuilder;
///
/// let config = RunConfigBuilder::new()
///     .analysis_name("bench_run")
///     .cache_capacity(200)
///     .batch_size(25)
///     .kernel_radius(3)
///     .background_percentile(95.0)
///     .noise_floor(1.5)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    pub fn analysis_name(mut self, name: impl Into<String>) -> Self {
        self.config.analysis_name = name.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.cache.workers = workers;
        self
    }

    pub fn kernel_radius(mut self, radius: u32) -> Self {
        self.config.filter.kernel_radius = radius;
        self
    }

    pub fn background_percentile(mut self, percentile: f32) -> Self {
        self.config.filter.background_percentile = percentile;
        self
    }

    pub fn noise_floor(mut self, floor: f32) -> Self {
        self.config.filter.noise_floor = floor;
        self
    }

    pub fn detection_margin(mut self, margin: f32) -> Self {
        self.config.detection.margin = margin;
        self
    }

    pub fn baseline_percentile(mut self, percentile: f32) -> Self {
        self.config.detection.baseline_percentile = percentile;
        self
    }

    pub fn audio_band_hz(mut self, low: f32, high: f32) -> Self {
        self.config.audio.band_hz = (low, high);
        self
    }

    pub fn audio_magnitude_percentile(mut self, percentile: f32) -> Self {
        self.config.audio.magnitude_percentile = percentile;
        self
    }

    pub fn min_beep_duration(mut self, seconds: f64) -> Self {
        self.config.audio.min_beep_duration = seconds;
        self
    }

    pub fn plot_scale(mut self, scale: u32) -> Self {
        self.config.plot_scale = scale;
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn detection(mut self, detection: DetectionConfig) -> Self {
        self.config.detection = detection;
        self
    }

    pub fn audio(mut self, audio: AudioConfig) -> Self {
        self.config.audio = audio;
        self
    }

    /// Consumes the builder and returns the assembled configuration.
    ///
    /// Validation happens separately via [`RunConfig::validate`] so callers
    /// can decide when to fail.
    pub fn build(self) -> RunConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = RunConfigBuilder::new()
            .analysis_name("test")
            .cache_capacity(12)
            .kernel_radius(0)
            .build();
        assert_eq!(config.analysis_name, "test");
        assert_eq!(config.cache.capacity, 12);
        assert_eq!(config.filter.kernel_radius, 0);
        assert_eq!(config.batch_size, super::super::DEFAULT_BATCH_SIZE);
    }
}
