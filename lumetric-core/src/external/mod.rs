//! Integrations with external decode tools (ffmpeg and ffprobe).
//!
//! Everything the core knows about containers and codecs lives here. The
//! rest of the library sees only the [`FrameSource`] trait, an opaque
//! frame/sample supplier.

mod audio_extractor;
mod frame_source;
mod media_probe;

pub use audio_extractor::{extract_audio, AudioBuffer};
pub use frame_source::{FfmpegFrameSource, Frame, FrameSource};
pub use media_probe::{get_video_properties, VideoProperties};
