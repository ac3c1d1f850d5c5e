//! Analysis run orchestration.
//!
//! Drives FrameSource -> FrameCache -> statistics across a frame range in
//! fixed-size batches: prefetches the next batch while processing the
//! current one, parallelizes per-frame work with rayon inside a batch,
//! reorders results by frame index, reports progress, and honours
//! cooperative cancellation at batch boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::cache::FrameCache;
use crate::config::RunConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::{Event, EventDispatcher};
use crate::external::FrameSource;
use crate::processing::mask::{MaskEngine, MaskMode};
use crate::processing::stats::{self, StatRecord};
use crate::region::{validate_regions, Region, RegionRole};

/// Inclusive frame range to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl FrameRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn frame_count(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Statistics for one region on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region_index: usize,
    pub record: StatRecord,
}

/// Outcome for one frame of the run.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameResult {
    Stats {
        frame_index: u64,
        /// Background level shared by every region on this frame, when a
        /// background region is configured.
        background_level: Option<f32>,
        records: Vec<RegionStats>,
    },
    /// The frame could not be decoded; all stats are undefined.
    Gap { frame_index: u64 },
}

impl FrameResult {
    pub fn frame_index(&self) -> u64 {
        match self {
            FrameResult::Stats { frame_index, .. } => *frame_index,
            FrameResult::Gap { frame_index } => *frame_index,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, FrameResult::Gap { .. })
    }
}

/// Result table of one completed run, ordered by frame index.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub rows: Vec<FrameResult>,
    pub regions: Vec<Region>,
    pub range: FrameRange,
    pub fps: f64,
    pub gap_count: u64,
    pub elapsed: Duration,
}

/// Lifecycle of an orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Cancellation handle for an in-flight run.
///
/// Cancellation is cooperative: the flag is checked at each batch boundary,
/// so latency is bounded by one batch.
#[derive(Debug, Clone, Default)]
pub struct AnalysisHandle {
    cancel: Arc<AtomicBool>,
}

impl AnalysisHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub(crate) fn flag(&self) -> &Arc<AtomicBool> {
        &self.cancel
    }
}

/// Drives a full analysis run over a frame range.
pub struct AnalysisOrchestrator {
    source: Arc<dyn FrameSource>,
    cache: Arc<FrameCache>,
    events: EventDispatcher,
    handle: AnalysisHandle,
    state: RunState,
}

impl AnalysisOrchestrator {
    pub fn new(
        source: Arc<dyn FrameSource>,
        cache: Arc<FrameCache>,
        events: EventDispatcher,
    ) -> Self {
        Self {
            source,
            cache,
            events,
            handle: AnalysisHandle::new(),
            state: RunState::Idle,
        }
    }

    /// Handle for cancelling the next/current run from another thread.
    pub fn handle(&self) -> AnalysisHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the analysis synchronously on the calling thread.
    ///
    /// Region snapshots and configuration are validated up front; an invalid
    /// region rejects the run before any frame is decoded. Frames that fail
    /// to decode become gap rows and the run continues.
    pub fn run(
        &mut self,
        range: FrameRange,
        regions: &[Region],
        config: &RunConfig,
        mask_mode: MaskMode,
    ) -> CoreResult<AnalysisResult> {
        if let Err(err) = self.validate_run(range, regions, config) {
            self.state = RunState::Failed;
            self.events.emit(Event::Error {
                message: format!("analysis run rejected: {err}"),
                context: None,
            });
            return Err(err);
        }

        let regions: Vec<Region> = regions.to_vec();
        let measurement: Vec<Region> = regions
            .iter()
            .filter(|r| r.role == RegionRole::Measurement)
            .copied()
            .collect();
        let background = regions
            .iter()
            .find(|r| r.role == RegionRole::Background)
            .copied();

        self.state = RunState::Running;
        // Clear any cancellation left over from a previous run; handles
        // obtained before this call stay valid.
        self.handle.flag().store(false, Ordering::Relaxed);
        let cancel = self.handle.flag().clone();
        let started = Instant::now();
        let total_frames = range.frame_count();

        self.events.emit(Event::AnalysisStarted {
            start_frame: range.start,
            end_frame: range.end,
            region_count: regions.len(),
        });

        let mut mask_engine = MaskEngine::new(mask_mode, config.filter);
        let mut rows: Vec<FrameResult> = Vec::with_capacity(total_frames as usize);
        let mut gap_count = 0u64;

        let batch_size = config.batch_size as u64;
        let mut batch_start = range.start;
        while batch_start <= range.end {
            if cancel.load(Ordering::Relaxed) {
                self.state = RunState::Cancelled;
                self.events.emit(Event::AnalysisCancelled {
                    frames_analyzed: rows.len() as u64,
                });
                return Err(CoreError::OperationCancelled);
            }

            let batch_end = (batch_start + batch_size - 1).min(range.end);

            // Keep the decoder busy with the next batch while this one runs.
            let next_start = batch_end + 1;
            if next_start <= range.end {
                let next_end = (next_start + batch_size - 1).min(range.end);
                self.cache.prefetch(next_start..=next_end);
            }

            // Fixed-mask capture needs one decoded frame before the batch
            // can be parallelized.
            if !mask_engine.fully_captured(&region_indices(&measurement)) {
                self.capture_fixed_masks(
                    &mut mask_engine,
                    &measurement,
                    background.as_ref(),
                    config,
                    batch_start,
                    range.end,
                );
            }

            let batch: Vec<FrameResult> = (batch_start..=batch_end)
                .collect::<Vec<u64>>()
                .par_iter()
                .map(|&frame_index| {
                    self.process_frame(
                        frame_index,
                        &measurement,
                        background.as_ref(),
                        &mask_engine,
                        config,
                    )
                })
                .collect();

            // rayon preserves input order, but the result table's ordering
            // guarantee should not depend on that detail.
            let mut batch = batch;
            batch.sort_by_key(FrameResult::frame_index);
            gap_count += batch.iter().filter(|row| row.is_gap()).count() as u64;
            rows.extend(batch);

            let frames_done = rows.len() as u64;
            let elapsed = started.elapsed();
            let speed = frames_done as f32 / elapsed.as_secs_f32().max(1e-6);
            let remaining = total_frames - frames_done;
            let eta = Duration::from_secs_f32(remaining as f32 / speed.max(1e-6));
            self.events.emit(Event::AnalysisProgress {
                frames_done,
                total_frames,
                percent: frames_done as f32 / total_frames as f32 * 100.0,
                fps: speed,
                eta,
            });

            batch_start = batch_end + 1;
        }

        self.state = RunState::Completed;

        let elapsed = started.elapsed();
        self.events.emit(Event::AnalysisComplete {
            frames_analyzed: total_frames - gap_count,
            gaps: gap_count,
            total_time: elapsed,
        });

        Ok(AnalysisResult {
            rows,
            regions,
            range,
            fps: self.source.fps(),
            gap_count,
            elapsed,
        })
    }

    fn validate_run(
        &self,
        range: FrameRange,
        regions: &[Region],
        config: &RunConfig,
    ) -> CoreResult<()> {
        config.validate()?;
        let (frame_width, frame_height) = self.source.dimensions();
        validate_regions(regions, frame_width, frame_height)?;
        if range.start > range.end {
            return Err(CoreError::InvalidConfig(format!(
                "frame range start {} exceeds end {}",
                range.start, range.end
            )));
        }
        let frame_count = self.source.frame_count();
        if range.end >= frame_count {
            return Err(CoreError::InvalidConfig(format!(
                "frame range end {} beyond last frame {}",
                range.end,
                frame_count.saturating_sub(1)
            )));
        }
        Ok(())
    }

    /// Processes a single frame: background level once, then every
    /// measurement region over the shared level.
    fn process_frame(
        &self,
        frame_index: u64,
        measurement: &[Region],
        background: Option<&Region>,
        mask_engine: &MaskEngine,
        config: &RunConfig,
    ) -> FrameResult {
        let frame = match self.cache.get(frame_index) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("recording gap for frame {frame_index}: {err}");
                self.events.emit(Event::Warning {
                    message: format!("frame {frame_index} could not be decoded: {err}"),
                });
                return FrameResult::Gap { frame_index };
            }
        };

        let background_level = background.map(|region| {
            let rgb = frame.region_rgb(&region.rect);
            stats::background_level(&rgb, &config.filter)
        });

        let records: Vec<RegionStats> = measurement
            .iter()
            .map(|region| {
                let rgb = frame.region_rgb(&region.rect);
                let mask = mask_engine.mask_for_region(
                    region.index,
                    &rgb,
                    region.rect.width,
                    region.rect.height,
                    background_level,
                );
                RegionStats {
                    region_index: region.index,
                    record: stats::compute_from_mask(&mask, background_level),
                }
            })
            .collect();

        FrameResult::Stats {
            frame_index,
            background_level,
            records,
        }
    }

    /// Captures fixed masks from the first decodable frame at or after
    /// `from`. Read failures skip forward; if nothing decodes the run will
    /// produce gaps anyway.
    fn capture_fixed_masks(
        &self,
        mask_engine: &mut MaskEngine,
        measurement: &[Region],
        background: Option<&Region>,
        config: &RunConfig,
        from: u64,
        until: u64,
    ) {
        for frame_index in from..=until {
            match self.cache.get(frame_index) {
                Ok(frame) => {
                    let background_level = background.map(|region| {
                        let rgb = frame.region_rgb(&region.rect);
                        stats::background_level(&rgb, &config.filter)
                    });
                    for region in measurement {
                        let rgb = frame.region_rgb(&region.rect);
                        mask_engine.capture_if_needed(
                            region.index,
                            &rgb,
                            region.rect.width,
                            region.rect.height,
                            background_level,
                        );
                    }
                    return;
                }
                Err(err) => {
                    log::debug!("fixed-mask capture skipping frame {frame_index}: {err}");
                }
            }
        }
    }
}

fn region_indices(regions: &[Region]) -> Vec<usize> {
    regions.iter().map(|r| r.index).collect()
}
