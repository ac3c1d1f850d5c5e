//! FFprobe integration for video stream metadata.
//!
//! Extracts the properties the analysis pipeline needs up front: dimensions,
//! frame rate, frame count, and duration.

use crate::error::{CoreError, CoreResult};
use ffprobe::ffprobe;
use std::path::Path;

/// Video stream properties relevant to analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
    pub duration_secs: f64,
    pub codec_name: Option<String>,
}

/// Parses an ffprobe rational like "30000/1001" into a float.
fn parse_rational(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => raw.parse().ok(),
    }
}

/// Gets video properties for a given input file.
pub fn get_video_properties(input_path: &Path) -> CoreResult<VideoProperties> {
    log::debug!(
        "Running ffprobe (via crate) for video properties on: {}",
        input_path.display()
    );
    let metadata = ffprobe(input_path).map_err(|err| {
        log::error!("ffprobe failed for {}: {:?}", input_path.display(), err);
        CoreError::FfprobeParse(format!(
            "ffprobe failed for {}: {err}",
            input_path.display()
        ))
    })?;

    let duration_secs = metadata
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| {
            CoreError::FfprobeParse(format!(
                "Failed to parse duration from format for {}",
                input_path.display()
            ))
        })?;

    let video_stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            CoreError::FfprobeParse(format!(
                "No video stream found in {}",
                input_path.display()
            ))
        })?;

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width <= 0 || height <= 0 {
        return Err(CoreError::FfprobeParse(format!(
            "Invalid dimensions in {}: width={width}, height={height}",
            input_path.display()
        )));
    }

    let fps = parse_rational(&video_stream.avg_frame_rate)
        .filter(|f| *f > 0.0)
        .or_else(|| parse_rational(&video_stream.r_frame_rate).filter(|f| *f > 0.0))
        .ok_or_else(|| {
            CoreError::FfprobeParse(format!(
                "Could not determine frame rate for {}",
                input_path.display()
            ))
        })?;

    // nb_frames is container metadata and often absent; fall back to
    // duration * fps.
    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration_secs * fps).round() as u64);

    Ok(VideoProperties {
        width: width as u32,
        height: height as u32,
        fps,
        frame_count,
        duration_secs,
        codec_name: video_stream.codec_name.clone(),
    })
}
