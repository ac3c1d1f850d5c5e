//! The `detect-range` command: find bright segments in a video.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use console::style;
use lumetric_core::{
    detect_range, scan_brightness, Event, EventDispatcher, FfmpegFrameSource, FrameSource,
    LogEventHandler,
};

use crate::cli::DetectRangeArgs;
use crate::commands::{build_regions, full_frame_region, load_config, CliResult};
use crate::progress::ProgressReporter;

pub fn run(args: DetectRangeArgs) -> CliResult {
    let config = load_config(args.config.as_deref())?;
    let source = FfmpegFrameSource::open(&args.input_path)?;
    let (width, height) = source.dimensions();
    let fps = source.fps();

    let regions = if args.regions.is_empty() {
        vec![full_frame_region(width, height)]
    } else {
        build_regions(&args.regions, None, None)?
    };

    let mut events = EventDispatcher::new();
    events.add_handler(Arc::new(LogEventHandler));
    events.add_handler(Arc::new(ProgressReporter::new()));

    let cancel = Arc::new(AtomicBool::new(false));
    let brightness = scan_brightness(&source, &regions, &events, &cancel)?;
    let candidates = detect_range(
        args.expected_duration,
        fps,
        &brightness,
        &config.detection,
    );
    events.emit(Event::ScanComplete {
        frames_scanned: brightness.len() as u64,
        candidates: candidates.len(),
    });

    if candidates.is_empty() {
        println!("{}", style("No bright segments found.").yellow());
        return Ok(());
    }

    println!("{}", style("Candidates (best first):").bold());
    for (rank, candidate) in candidates.iter().take(args.top).enumerate() {
        let duration = candidate.frame_count() as f64 / fps;
        println!(
            "  {}. frames {}-{} ({} frames, {:.2}s) confidence {:.2}",
            rank + 1,
            candidate.start_frame,
            candidate.end_frame,
            candidate.frame_count(),
            duration,
            candidate.confidence,
        );
    }
    Ok(())
}
