//! Frame decode abstraction and its ffmpeg-backed implementation.
//!
//! [`FrameSource`] is the seam between the analysis pipeline and the decoder:
//! the cache, orchestrator, and scanners only ever ask for "frame N as rgb24".
//! [`FfmpegFrameSource`] satisfies that by seeking with ffmpeg and reading a
//! single rawvideo frame off a pipe.

use crate::error::{command_start_error, source_read_error, CoreResult};
use crate::external::media_probe::{get_video_properties, VideoProperties};
use crate::region::Rect;
use chrono::{DateTime, Utc};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::path::{Path, PathBuf};

/// One decoded video frame in rgb24 layout.
///
/// Immutable once constructed; the cache shares it by `Arc` and the
/// orchestrator only ever borrows pixel data out of it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Packed rgb24, row-major, `width * height * 3` bytes.
    pub data: Vec<u8>,
    pub decoded_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 3);
        Self {
            index,
            width,
            height,
            data,
            decoded_at: Utc::now(),
        }
    }

    /// Copies the rgb24 pixel block covered by `rect` out of the frame.
    ///
    /// The rectangle must already be validated against the frame bounds.
    pub fn region_rgb(&self, rect: &Rect) -> Vec<u8> {
        let stride = self.width as usize * 3;
        let row_bytes = rect.width as usize * 3;
        let mut out = Vec::with_capacity(rect.height as usize * row_bytes);
        for row in rect.y..rect.y + rect.height {
            let start = row as usize * stride + rect.x as usize * 3;
            out.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        out
    }
}

/// Opaque supplier of decoded frames, keyed by zero-based index.
///
/// Implementations must be shareable across the decode worker pool.
pub trait FrameSource: Send + Sync {
    /// Decodes the frame at `index`. Failures surface as
    /// `CoreError::SourceRead` and must leave no partial state behind.
    fn read_frame(&self, index: u64) -> CoreResult<Frame>;

    fn frame_count(&self) -> u64;

    fn fps(&self) -> f64;

    /// (width, height) of every frame this source yields.
    fn dimensions(&self) -> (u32, u32);
}

/// [`FrameSource`] backed by an ffmpeg process per read.
///
/// Seeks to `index / fps` with an input-side `-ss` (keyframe seek plus
/// decode-forward), then reads exactly one rgb24 frame from stdout.
pub struct FfmpegFrameSource {
    path: PathBuf,
    props: VideoProperties,
}

impl FfmpegFrameSource {
    /// Probes `path` and prepares a source for it.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let props = get_video_properties(path)?;
        log::info!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames",
            path.display(),
            props.width,
            props.height,
            props.fps,
            props.frame_count
        );
        Ok(Self {
            path: path.to_path_buf(),
            props,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn properties(&self) -> &VideoProperties {
        &self.props
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read_frame(&self, index: u64) -> CoreResult<Frame> {
        if index >= self.props.frame_count {
            return Err(source_read_error(
                index,
                format!(
                    "frame index {} beyond end of video ({} frames)",
                    index, self.props.frame_count
                ),
            ));
        }

        let timestamp = index as f64 / self.props.fps;
        let mut cmd = FfmpegCommand::new();
        cmd.args(["-ss", &format!("{timestamp:.6}")]);
        cmd.input(self.path.to_string_lossy());
        cmd.args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24"]);
        cmd.output("-");

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg", e))?;

        let iterator = child
            .iter()
            .map_err(|e| source_read_error(index, e.to_string()))?;

        let mut frame = None;
        for event in iterator {
            match event {
                FfmpegEvent::OutputFrame(f) => {
                    if frame.is_none() {
                        frame = Some(Frame::new(index, f.width, f.height, f.data));
                    }
                }
                FfmpegEvent::Error(e) => {
                    log::warn!("ffmpeg error decoding frame {index}: {e}");
                }
                _ => {}
            }
        }
        let _ = child.wait();

        frame.ok_or_else(|| source_read_error(index, "ffmpeg produced no frame"))
    }

    fn frame_count(&self) -> u64 {
        self.props.frame_count
    }

    fn fps(&self) -> f64 {
        self.props.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.props.width, self.props.height)
    }
}
