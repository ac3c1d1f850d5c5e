//! Audio track extraction for completion-beep detection.
//!
//! Decodes the first audio stream to mono f32 PCM at a fixed analysis rate
//! via ffmpeg, collecting raw bytes off the pipe.

use crate::error::{command_start_error, CoreError, CoreResult};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::path::Path;

/// Sample rate all audio analysis runs at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 44_100;

/// Mono PCM buffer extracted from a video's audio track.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Extracts the audio track of `path` as mono f32 samples at
/// [`ANALYSIS_SAMPLE_RATE`].
///
/// A video without an audio stream yields `CoreError::AudioDecode`.
pub fn extract_audio(path: &Path) -> CoreResult<AudioBuffer> {
    log::debug!("Extracting audio from {}", path.display());

    let mut cmd = FfmpegCommand::new();
    cmd.input(path.to_string_lossy());
    cmd.args([
        "-map",
        "0:a:0",
        "-ac",
        "1",
        "-ar",
        &ANALYSIS_SAMPLE_RATE.to_string(),
        "-f",
        "f32le",
    ]);
    cmd.output("-");

    let mut child = cmd
        .spawn()
        .map_err(|e| command_start_error("ffmpeg", e))?;

    let iterator = child
        .iter()
        .map_err(|e| CoreError::AudioDecode(e.to_string()))?;

    let mut bytes: Vec<u8> = Vec::new();
    let mut ffmpeg_error = None;
    for event in iterator {
        match event {
            FfmpegEvent::OutputChunk(chunk) => bytes.extend_from_slice(&chunk),
            FfmpegEvent::Error(e) => ffmpeg_error = Some(e),
            _ => {}
        }
    }
    let _ = child.wait();

    if bytes.is_empty() {
        let detail = ffmpeg_error.unwrap_or_else(|| "no audio stream".to_string());
        return Err(CoreError::AudioDecode(format!(
            "no audio decoded from {}: {detail}",
            path.display()
        )));
    }

    // Trailing partial sample from a truncated pipe is dropped.
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    log::info!(
        "Extracted {:.2}s of audio ({} samples at {} Hz)",
        samples.len() as f64 / f64::from(ANALYSIS_SAMPLE_RATE),
        samples.len(),
        ANALYSIS_SAMPLE_RATE
    );

    Ok(AudioBuffer {
        samples,
        sample_rate: ANALYSIS_SAMPLE_RATE,
    })
}
