//! CSV table writer and reader for per-region analysis results.
//!
//! Schema, one row per frame:
//! `frame,l_raw_mean,l_raw_median,l_bg_sub_mean,l_bg_sub_median,blue_mean,blue_median,timestamp`
//!
//! `frame` is the zero-based source frame index and `timestamp` the frame
//! time in seconds. Stat values are rounded to two decimal places on write.
//! Gap frames are written with empty stat fields so downstream tooling can
//! tell "measured zero" apart from "not measured".

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::processing::{AnalysisResult, FrameResult};

const HEADER: &str =
    "frame,l_raw_mean,l_raw_median,l_bg_sub_mean,l_bg_sub_median,blue_mean,blue_median,timestamp";

/// The six exported stat columns for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportStats {
    pub l_raw_mean: f32,
    pub l_raw_median: f32,
    pub l_bg_sub_mean: f32,
    pub l_bg_sub_median: f32,
    pub blue_mean: f32,
    pub blue_median: f32,
}

/// One parsed CSV row. `stats` is `None` for gap rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub frame: u64,
    pub timestamp_secs: f64,
    pub stats: Option<ExportStats>,
}

/// Writes the table for one measurement region to `path`.
pub fn write_region_csv(
    result: &AnalysisResult,
    region_index: usize,
    path: &Path,
) -> CoreResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{HEADER}")?;

    for row in &result.rows {
        let frame_index = row.frame_index();
        let timestamp = if result.fps > 0.0 {
            frame_index as f64 / result.fps
        } else {
            0.0
        };
        match row {
            FrameResult::Stats { records, .. } => {
                let record = records
                    .iter()
                    .find(|r| r.region_index == region_index)
                    .map(|r| &r.record);
                match record {
                    Some(record) => writeln!(
                        writer,
                        "{frame_index},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{timestamp:.3}",
                        record.raw_mean,
                        record.raw_median,
                        record.bg_sub_mean,
                        record.bg_sub_median,
                        record.blue_mean,
                        record.blue_median,
                    )?,
                    // Region absent from this frame's records; treat as a gap.
                    None => writeln!(writer, "{frame_index},,,,,,,{timestamp:.3}")?,
                }
            }
            FrameResult::Gap { .. } => {
                writeln!(writer, "{frame_index},,,,,,,{timestamp:.3}")?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Reads a table previously written by [`write_region_csv`].
pub fn read_csv(path: &Path) -> CoreResult<Vec<ExportRow>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| CoreError::CsvParse("empty file".to_string()))??;
    if header.trim() != HEADER {
        return Err(CoreError::CsvParse(format!(
            "unexpected header: {header}"
        )));
    }

    let mut rows = Vec::new();
    for (line_number, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(parse_row(&line).map_err(|msg| {
            CoreError::CsvParse(format!("line {}: {msg}", line_number + 2))
        })?);
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Result<ExportRow, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 8 {
        return Err(format!("expected 8 fields, found {}", fields.len()));
    }

    let frame: u64 = fields[0]
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame index {:?}", fields[0]))?;
    let timestamp_secs: f64 = fields[7]
        .trim()
        .parse()
        .map_err(|_| format!("invalid timestamp {:?}", fields[7]))?;

    let stat_fields = &fields[1..7];
    let all_empty = stat_fields.iter().all(|f| f.trim().is_empty());
    if all_empty {
        return Ok(ExportRow {
            frame,
            timestamp_secs,
            stats: None,
        });
    }

    let mut values = [0.0f32; 6];
    for (slot, field) in values.iter_mut().zip(stat_fields) {
        *slot = field
            .trim()
            .parse()
            .map_err(|_| format!("invalid stat value {field:?}"))?;
    }
    Ok(ExportRow {
        frame,
        timestamp_secs,
        stats: Some(ExportStats {
            l_raw_mean: values[0],
            l_raw_median: values[1],
            l_bg_sub_mean: values[2],
            l_bg_sub_median: values[3],
            blue_mean: values[4],
            blue_median: values[5],
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{FrameRange, RegionStats, StatRecord};
    use crate::region::{Rect, Region, RegionRole};
    use std::time::Duration;

    fn record(base: f32) -> StatRecord {
        StatRecord {
            raw_mean: base + 0.123,
            raw_median: base + 0.456,
            bg_sub_mean: base,
            bg_sub_median: base + 0.789,
            blue_mean: base * 2.0 + 0.011,
            blue_median: base * 2.0 + 0.015,
            analyzed_pixel_count: 100,
            total_pixel_count: 128,
        }
    }

    fn result_with_rows(rows: Vec<FrameResult>) -> AnalysisResult {
        let range = FrameRange::new(
            rows.first().map(FrameResult::frame_index).unwrap_or(0),
            rows.last().map(FrameResult::frame_index).unwrap_or(0),
        );
        AnalysisResult {
            gap_count: rows.iter().filter(|r| r.is_gap()).count() as u64,
            rows,
            regions: vec![Region {
                rect: Rect {
                    x: 0,
                    y: 0,
                    width: 16,
                    height: 8,
                },
                role: RegionRole::Measurement,
                index: 0,
            }],
            range,
            fps: 25.0,
            elapsed: Duration::from_secs(1),
        }
    }

    fn stats_row(frame_index: u64, base: f32) -> FrameResult {
        FrameResult::Stats {
            frame_index,
            background_level: None,
            records: vec![RegionStats {
                region_index: 0,
                record: record(base),
            }],
        }
    }

    fn round2(v: f32) -> f32 {
        (v * 100.0).round() / 100.0
    }

    #[test]
    fn round_trip_preserves_values_to_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = result_with_rows(vec![stats_row(0, 12.3), stats_row(1, 45.6)]);

        write_region_csv(&result, 0, &path).unwrap();
        let rows = read_csv(&path).unwrap();

        assert_eq!(rows.len(), 2);
        let original = record(12.3);
        let parsed = rows[0].stats.unwrap();
        assert_eq!(parsed.l_raw_mean, round2(original.raw_mean));
        assert_eq!(parsed.l_raw_median, round2(original.raw_median));
        assert_eq!(parsed.l_bg_sub_mean, round2(original.bg_sub_mean));
        assert_eq!(parsed.l_bg_sub_median, round2(original.bg_sub_median));
        assert_eq!(parsed.blue_mean, round2(original.blue_mean));
        assert_eq!(parsed.blue_median, round2(original.blue_median));
    }

    #[test]
    fn gap_rows_have_empty_stat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = result_with_rows(vec![
            stats_row(10, 1.0),
            FrameResult::Gap { frame_index: 11 },
            stats_row(12, 2.0),
        ]);

        write_region_csv(&result, 0, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let gap_line = contents.lines().nth(2).unwrap();
        assert!(gap_line.starts_with("11,,,,,,,"));

        let rows = read_csv(&path).unwrap();
        assert_eq!(rows[1].frame, 11);
        assert!(rows[1].stats.is_none());
        assert!(rows[0].stats.is_some());
        assert!(rows[2].stats.is_some());
    }

    #[test]
    fn timestamps_follow_frame_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = result_with_rows(vec![stats_row(0, 1.0), stats_row(50, 1.0)]);

        write_region_csv(&result, 0, &path).unwrap();
        let rows = read_csv(&path).unwrap();
        assert!((rows[0].timestamp_secs - 0.0).abs() < 1e-9);
        assert!((rows[1].timestamp_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "frame,mean\n0,1.0\n").unwrap();
        assert!(matches!(read_csv(&path), Err(CoreError::CsvParse(_))));
    }

    #[test]
    fn rejects_short_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, format!("{HEADER}\n0,1.0,2.0\n")).unwrap();
        let err = read_csv(&path).unwrap_err();
        assert!(matches!(err, CoreError::CsvParse(msg) if msg.contains("line 2")));
    }
}
