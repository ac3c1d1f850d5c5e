//! Terminal progress rendering for core events.
//!
//! Implements the core's [`EventHandler`] with an `indicatif` progress bar
//! for long scans and analysis runs, and `console` styling for one-shot
//! status lines.

use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lumetric_core::{Event, EventHandler};

pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_bar(&self, total: u64, prefix: &str) {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar.set_prefix(prefix.to_string());
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn finish_bar(&self, message: String) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_with_message(message);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for ProgressReporter {
    fn handle(&self, event: &Event) {
        match event {
            Event::ScanStarted { total_frames } => {
                self.start_bar(*total_frames, "Scanning");
            }
            Event::ScanProgress { current, .. } => {
                if let Some(bar) = self.bar.lock().unwrap().as_ref() {
                    bar.set_position(*current);
                }
            }
            Event::ScanComplete {
                frames_scanned,
                candidates,
            } => {
                self.finish_bar(format!(
                    "{frames_scanned} frames scanned, {candidates} candidate(s)"
                ));
            }
            Event::AnalysisStarted {
                start_frame,
                end_frame,
                region_count,
            } => {
                println!(
                    "{} frames {start_frame}-{end_frame}, {region_count} region(s)",
                    style("Analyzing").bold()
                );
                self.start_bar(end_frame - start_frame + 1, "Analyzing");
            }
            Event::AnalysisProgress {
                frames_done,
                fps,
                eta,
                ..
            } => {
                if let Some(bar) = self.bar.lock().unwrap().as_ref() {
                    bar.set_position(*frames_done);
                    bar.set_message(format!("{fps:.1} fps, ETA {}", format_eta(*eta)));
                }
            }
            Event::AnalysisComplete {
                frames_analyzed,
                gaps,
                total_time,
            } => {
                self.finish_bar(String::new());
                let gaps_note = if *gaps > 0 {
                    format!(", {} gap(s)", style(gaps).yellow())
                } else {
                    String::new()
                };
                println!(
                    "{} {frames_analyzed} frame(s) in {}{gaps_note}",
                    style("Analyzed").green().bold(),
                    format_eta(*total_time)
                );
            }
            Event::AnalysisCancelled { frames_analyzed } => {
                self.finish_bar(String::new());
                println!(
                    "{} after {frames_analyzed} frame(s)",
                    style("Cancelled").yellow().bold()
                );
            }
            Event::AudioExtractionStarted { input_file } => {
                println!("{} audio from {input_file}", style("Extracting").bold());
            }
            Event::BeepDetectionComplete { beeps_found } => {
                println!("{} {beeps_found} beep(s)", style("Detected").green().bold());
            }
            Event::FileWritten { path } => {
                println!("{} {}", style("Wrote").green(), path.display());
            }
            Event::Warning { message } => {
                // Suspend the bar so the warning is not overdrawn.
                let guard = self.bar.lock().unwrap();
                match guard.as_ref() {
                    Some(bar) => bar.println(format!("{} {message}", style("warning:").yellow())),
                    None => eprintln!("{} {message}", style("warning:").yellow()),
                }
            }
            Event::Error { message, context } => {
                let ctx = context
                    .as_ref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default();
                eprintln!("{} {message}{ctx}", style("error:").red().bold());
            }
        }
    }
}

fn format_eta(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
