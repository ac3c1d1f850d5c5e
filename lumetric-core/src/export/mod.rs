//! Export writers: per-region CSV tables and dual-panel plots.
//!
//! Rounding to two decimal places happens here and only here; the analysis
//! engines upstream stay in full floating point.

mod csv;
mod plot;

pub use csv::{read_csv, write_region_csv, ExportRow, ExportStats};
pub use plot::write_region_plot;

use std::path::Path;

use crate::processing::FrameRange;

/// `{analysis_name}_{video_name}_ROI{N}_frames{start}-{end}_brightness.csv`
pub fn csv_file_name(
    analysis_name: &str,
    video_name: &str,
    region_index: usize,
    range: FrameRange,
) -> String {
    format!(
        "{analysis_name}_{video_name}_ROI{region_index}_frames{}-{}_brightness.csv",
        range.start, range.end
    )
}

/// `{analysis_name}_{video_name}_ROI{N}_frames{start}-{end}_plot.png`
pub fn plot_file_name(
    analysis_name: &str,
    video_name: &str,
    region_index: usize,
    range: FrameRange,
) -> String {
    format!(
        "{analysis_name}_{video_name}_ROI{region_index}_frames{}-{}_plot.png",
        range.start, range.end
    )
}

/// Stem of the video file, for embedding in export names.
pub fn video_name_for_export(video_path: &Path) -> String {
    video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_convention() {
        let range = FrameRange::new(100, 200);
        assert_eq!(
            csv_file_name("bench", "clip01", 2, range),
            "bench_clip01_ROI2_frames100-200_brightness.csv"
        );
        assert_eq!(
            plot_file_name("bench", "clip01", 2, range),
            "bench_clip01_ROI2_frames100-200_plot.png"
        );
    }

    #[test]
    fn video_name_strips_extension() {
        assert_eq!(
            video_name_for_export(Path::new("/data/runs/clip01.mp4")),
            "clip01"
        );
    }
}
