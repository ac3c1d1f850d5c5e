//! The `detect-beeps` command: locate completion beeps in the audio track.

use std::sync::Arc;

use console::style;
use lumetric_core::processing::beep_detection;
use lumetric_core::{
    detect_completion, extract_audio, get_video_properties, Event, EventDispatcher,
    LogEventHandler,
};

use crate::cli::DetectBeepsArgs;
use crate::commands::{load_config, CliResult};
use crate::progress::ProgressReporter;

pub fn run(args: DetectBeepsArgs) -> CliResult {
    let config = load_config(args.config.as_deref())?;

    let mut events = EventDispatcher::new();
    events.add_handler(Arc::new(LogEventHandler));
    events.add_handler(Arc::new(ProgressReporter::new()));

    events.emit(Event::AudioExtractionStarted {
        input_file: args.input_path.display().to_string(),
    });
    let audio = extract_audio(&args.input_path)?;
    log::info!(
        "Extracted {:.1}s of audio at {} Hz",
        audio.duration_secs(),
        audio.sample_rate
    );

    let beeps = detect_completion(&audio.samples, audio.sample_rate, &config.audio);
    events.emit(Event::BeepDetectionComplete {
        beeps_found: beeps.len(),
    });

    if beeps.is_empty() {
        println!("{}", style("No beeps found.").yellow());
        return Ok(());
    }

    for beep in &beeps {
        println!(
            "  {:.2}s ({:.0} Hz, {:.2}s long)",
            beep.time_seconds, beep.peak_frequency, beep.duration_seconds
        );
    }

    if let (Some(expected), Some(strongest)) =
        (args.expected_duration, beep_detection::strongest(&beeps))
    {
        let fps = get_video_properties(&args.input_path)?.fps;
        let start = beep_detection::start_frame_from_beep(strongest, expected, fps);
        println!(
            "{} frame {start} (strongest beep midpoint at {:.2}s, {expected:.1}s back at {fps:.3} fps)",
            style("Suggested start:").bold(),
            strongest.center_seconds(),
        );
    }
    Ok(())
}
