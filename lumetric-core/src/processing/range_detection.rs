//! Brightness-based analysis range detection.
//!
//! Scans the whole video's measurement-region brightness, derives a
//! threshold from a low-percentile baseline, and proposes contiguous
//! above-threshold runs as candidate analysis windows scored against the
//! expected event duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::error::CoreResult;
use crate::events::{Event, EventDispatcher};
use crate::external::FrameSource;
use crate::processing::stats::{mean, percentile};
use crate::region::{Region, RegionRole};

/// How often scan progress is reported, in frames.
const SCAN_PROGRESS_INTERVAL: u64 = 10;

/// A detector-proposed contiguous frame range, never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCandidate {
    pub start_frame: u64,
    /// Inclusive end frame.
    pub end_frame: u64,
    /// Match against the expected duration, in [0, 1].
    pub confidence: f32,
    /// Mean brightness margin above the threshold; tie-break hint only.
    pub strength: f32,
}

impl RangeCandidate {
    pub fn frame_count(&self) -> u64 {
        self.end_frame - self.start_frame + 1
    }
}

/// Scans every frame and returns the mean raw lightness of the measurement
/// regions per frame.
///
/// A read failure ends the scan early with a warning (the frames gathered so
/// far are still usable); cancellation returns `OperationCancelled`.
pub fn scan_brightness(
    source: &dyn FrameSource,
    regions: &[Region],
    events: &EventDispatcher,
    cancel: &Arc<AtomicBool>,
) -> CoreResult<Vec<f32>> {
    let total = source.frame_count();
    events.emit(Event::ScanStarted {
        total_frames: total,
    });

    let measurement_rects: Vec<_> = regions
        .iter()
        .filter(|r| r.role == RegionRole::Measurement)
        .map(|r| r.rect)
        .collect();

    let mut series = Vec::with_capacity(total as usize);
    for index in 0..total {
        if cancel.load(Ordering::Relaxed) {
            return Err(crate::error::CoreError::OperationCancelled);
        }

        let frame = match source.read_frame(index) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("brightness scan stopped early at frame {index}: {err}");
                events.emit(Event::Warning {
                    message: format!("scan stopped early at frame {index}: {err}"),
                });
                break;
            }
        };

        let per_region: Vec<f32> = measurement_rects
            .iter()
            .map(|rect| {
                let rgb = frame.region_rgb(rect);
                mean(&crate::processing::mask::lightness_plane(&rgb))
            })
            .collect();
        series.push(mean(&per_region));

        if index % SCAN_PROGRESS_INTERVAL == 0 {
            events.emit(Event::ScanProgress {
                current: index + 1,
                total,
            });
        }
    }

    Ok(series)
}

/// Proposes candidate analysis windows from a per-frame brightness series,
/// most confident first.
///
/// Baseline is the configured low percentile of the series; threshold is
/// baseline plus the configured margin. A series with no frame above
/// threshold yields an empty vec, not an error.
pub fn detect(
    expected_duration_secs: Option<f64>,
    fps: f64,
    brightness: &[f32],
    config: &DetectionConfig,
) -> Vec<RangeCandidate> {
    if brightness.is_empty() || fps <= 0.0 {
        return Vec::new();
    }

    let baseline = percentile(brightness, config.baseline_percentile);
    let threshold = baseline + config.margin;
    log::debug!(
        "range detection: baseline={baseline:.2}, threshold={threshold:.2} over {} frames",
        brightness.len()
    );

    // Collect contiguous above-threshold runs.
    let mut runs: Vec<(u64, u64)> = Vec::new();
    let mut run_start: Option<u64> = None;
    for (index, &value) in brightness.iter().enumerate() {
        if value >= threshold {
            if run_start.is_none() {
                run_start = Some(index as u64);
            }
        } else if let Some(start) = run_start.take() {
            runs.push((start, index as u64 - 1));
        }
    }
    if let Some(start) = run_start {
        runs.push((start, brightness.len() as u64 - 1));
    }
    if runs.is_empty() {
        return Vec::new();
    }

    let longest = runs
        .iter()
        .map(|(start, end)| end - start + 1)
        .max()
        .unwrap_or(1);

    let mut candidates: Vec<RangeCandidate> = runs
        .into_iter()
        .map(|(start_frame, end_frame)| {
            let frames = end_frame - start_frame + 1;
            let confidence = match expected_duration_secs {
                Some(expected) if expected > 0.0 => {
                    let actual = frames as f64 / fps;
                    (1.0 - (actual - expected).abs() / expected).clamp(0.0, 1.0) as f32
                }
                _ => frames as f32 / longest as f32,
            };
            let strength = mean(
                &brightness[start_frame as usize..=end_frame as usize]
                    .iter()
                    .map(|&v| v - threshold)
                    .collect::<Vec<f32>>(),
            );
            RangeCandidate {
                start_frame,
                end_frame,
                confidence,
                strength,
            }
        })
        .collect();

    // Most confident first; equal confidence prefers the stronger run.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    candidates
}
