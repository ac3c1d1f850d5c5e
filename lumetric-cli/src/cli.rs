//! Command-line argument structures.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Lumetric: region-based video brightness analyzer",
    long_about = "Measures perceptual brightness and blue-channel statistics over \
                  user-defined regions of video frames, with background subtraction, \
                  range detection, and audio completion-beep detection."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyzes brightness over a frame range and exports CSV tables and plots
    Analyze(AnalyzeArgs),
    /// Scans a video for bright segments matching an expected duration
    DetectRange(DetectRangeArgs),
    /// Detects completion beeps in the audio track
    DetectBeeps(DetectBeepsArgs),
    /// Prints video stream properties
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input video file or directory of videos
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Directory where CSV tables and plots are written
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Measurement region as x,y,width,height (repeatable, up to 8 regions total)
    #[arg(long = "region", value_name = "X,Y,W,H")]
    pub regions: Vec<String>,

    /// Background region as x,y,width,height (at most one)
    #[arg(long = "background", value_name = "X,Y,W,H")]
    pub background: Option<String>,

    /// JSON file with region definitions (alternative to --region/--background)
    #[arg(long = "regions-file", value_name = "FILE", conflicts_with_all = ["regions", "background"])]
    pub regions_file: Option<PathBuf>,

    /// First frame to analyze (zero-based)
    #[arg(long, value_name = "FRAME", default_value_t = 0)]
    pub start: u64,

    /// Last frame to analyze, inclusive (defaults to the end of the video)
    #[arg(long, value_name = "FRAME")]
    pub end: Option<u64>,

    /// JSON configuration file (filter, cache, detection, audio settings)
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "LUMETRIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name prefixed to exported files (overrides the configured name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Capture the noise mask once from the first frame instead of per frame
    #[arg(long)]
    pub fixed_mask: bool,

    /// Skip plot rendering, export CSV only
    #[arg(long)]
    pub no_plot: bool,
}

#[derive(Args, Debug)]
pub struct DetectRangeArgs {
    /// Input video file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Measurement region as x,y,width,height (repeatable; defaults to the full frame)
    #[arg(long = "region", value_name = "X,Y,W,H")]
    pub regions: Vec<String>,

    /// Expected duration of the bright segment in seconds, for confidence scoring
    #[arg(long, value_name = "SECONDS")]
    pub expected_duration: Option<f64>,

    /// JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "LUMETRIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of candidates to print
    #[arg(long, value_name = "COUNT", default_value_t = 5)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct DetectBeepsArgs {
    /// Input video file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Expected run duration in seconds; when given, a suggested start frame
    /// is derived from the strongest beep
    #[arg(long, value_name = "SECONDS")]
    pub expected_duration: Option<f64>,

    /// JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "LUMETRIC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input video file or directory of videos
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_analyze_basic_args() {
        let cli = Cli::parse_from([
            "lumetric", "analyze", "-i", "clip.mp4", "-o", "out", "--region", "10,10,100,50",
        ]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.input_path, PathBuf::from("clip.mp4"));
                assert_eq!(args.output_dir, PathBuf::from("out"));
                assert_eq!(args.regions, vec!["10,10,100,50".to_string()]);
                assert_eq!(args.start, 0);
                assert!(args.end.is_none());
                assert!(!args.fixed_mask);
                assert!(!args.no_plot);
            }
            _ => panic!("expected analyze command"),
        }
    }

    #[test]
    fn parse_analyze_with_background_and_range() {
        let cli = Cli::parse_from([
            "lumetric",
            "analyze",
            "-i",
            "clip.mp4",
            "-o",
            "out",
            "--region",
            "10,10,100,50",
            "--region",
            "200,10,100,50",
            "--background",
            "0,0,32,32",
            "--start",
            "100",
            "--end",
            "500",
            "--fixed-mask",
        ]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.regions.len(), 2);
                assert_eq!(args.background.as_deref(), Some("0,0,32,32"));
                assert_eq!(args.start, 100);
                assert_eq!(args.end, Some(500));
                assert!(args.fixed_mask);
            }
            _ => panic!("expected analyze command"),
        }
    }

    #[test]
    fn parse_detect_range_defaults() {
        let cli = Cli::parse_from(["lumetric", "detect-range", "-i", "clip.mp4"]);
        match cli.command {
            Commands::DetectRange(args) => {
                assert!(args.regions.is_empty());
                assert!(args.expected_duration.is_none());
                assert_eq!(args.top, 5);
            }
            _ => panic!("expected detect-range command"),
        }
    }

    #[test]
    fn parse_detect_beeps_with_duration() {
        let cli = Cli::parse_from([
            "lumetric",
            "detect-beeps",
            "-i",
            "clip.mp4",
            "--expected-duration",
            "90.5",
        ]);
        match cli.command {
            Commands::DetectBeeps(args) => {
                assert_eq!(args.expected_duration, Some(90.5));
            }
            _ => panic!("expected detect-beeps command"),
        }
    }
}
