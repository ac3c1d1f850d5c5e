//! Core library for region-based video brightness analysis using ffmpeg and ffprobe.
//!
//! This crate provides video discovery and probing, a single-flight LRU frame
//! cache with worker prefetch, perceptual lightness and blue-channel statistics
//! over user-defined regions with background subtraction and noise filtering,
//! brightness-based range detection, audio completion-beep detection, and CSV
//! and plot export.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lumetric_core::{
//!     AnalysisOrchestrator, EventDispatcher, FfmpegFrameSource, FrameCache, FrameRange,
//!     MaskMode, Rect, Region, RegionRole, RunConfig,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = RunConfig::default();
//! let source = Arc::new(FfmpegFrameSource::open(Path::new("/path/to/video.mp4")).unwrap());
//! let cache = Arc::new(
//!     FrameCache::new(
//!         source.clone(),
//!         config.cache.capacity,
//!         config.cache.effective_workers(),
//!     )
//!     .unwrap(),
//! );
//! let regions = vec![Region {
//!     rect: Rect { x: 100, y: 100, width: 200, height: 150 },
//!     role: RegionRole::Measurement,
//!     index: 0,
//! }];
//!
//! let mut orchestrator = AnalysisOrchestrator::new(source, cache, EventDispatcher::new());
//! let result = orchestrator
//!     .run(FrameRange::new(0, 499), &regions, &config, MaskMode::Ephemeral)
//!     .unwrap();
//! println!("analyzed {} frames, {} gaps", result.rows.len(), result.gap_count);
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod export;
pub mod external;
pub mod processing;
pub mod region;

// Re-exports for public API
pub use cache::{CacheStats, FrameCache};
pub use config::{
    AudioConfig, CacheConfig, DetectionConfig, FilterConfig, RunConfig, RunConfigBuilder,
};
pub use discovery::{find_video_files, resolve_input};
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventDispatcher, EventHandler, LogEventHandler};
pub use export::{
    csv_file_name, plot_file_name, read_csv, video_name_for_export, write_region_csv,
    write_region_plot,
};
pub use external::{
    extract_audio, get_video_properties, AudioBuffer, FfmpegFrameSource, Frame, FrameSource,
    VideoProperties,
};
pub use processing::{
    detect_completion, detect_range, scan_brightness, start_frame_from_beep, AnalysisHandle,
    AnalysisOrchestrator, AnalysisResult, BeepEvent, FrameRange, FrameResult, MaskEngine, MaskMode,
    RangeCandidate, RegionStats, RunState, StatRecord,
};
pub use region::{validate_regions, Rect, Region, RegionRole, MAX_REGIONS};
