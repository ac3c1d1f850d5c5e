//! Analysis pipeline: masks, statistics, detectors, and orchestration.

pub mod beep_detection;
pub mod mask;
pub mod orchestrator;
pub mod range_detection;
pub mod stats;

pub use beep_detection::{detect_completion, start_frame_from_beep, BeepEvent};
pub use mask::{MaskEngine, MaskMode, RegionMask};
pub use orchestrator::{
    AnalysisHandle, AnalysisOrchestrator, AnalysisResult, FrameRange, FrameResult, RegionStats,
    RunState,
};
pub use range_detection::{detect as detect_range, scan_brightness, RangeCandidate};
pub use stats::StatRecord;
