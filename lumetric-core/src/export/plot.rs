//! Dual-panel raster plot of one region's analysis run.
//!
//! Top panel: background-subtracted lightness mean and median with a rolling
//! mean +/- one standard deviation band. Bottom panel: blue channel mean and
//! median. Rendered straight into an RGB buffer with the `image` crate; axes
//! are unlabelled gridlines, the file name carries the identifying context.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::CoreResult;
use crate::processing::{AnalysisResult, FrameResult};

const PANEL_WIDTH: u32 = 800;
const PANEL_HEIGHT: u32 = 260;
const MARGIN: u32 = 30;
const ROLLING_WINDOW: usize = 15;

const BACKGROUND: Rgb<u8> = Rgb([250, 250, 250]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const AXIS: Rgb<u8> = Rgb([80, 80, 80]);
const MEAN_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const MEDIAN_COLOR: Rgb<u8> = Rgb([255, 127, 14]);
const BAND_COLOR: Rgb<u8> = Rgb([197, 220, 240]);
const BLUE_MEAN_COLOR: Rgb<u8> = Rgb([44, 62, 148]);
const BLUE_MEDIAN_COLOR: Rgb<u8> = Rgb([120, 144, 226]);

/// Renders the plot for one measurement region and writes it as PNG.
pub fn write_region_plot(
    result: &AnalysisResult,
    region_index: usize,
    plot_scale: u32,
    path: &Path,
) -> CoreResult<()> {
    let image = render(result, region_index, plot_scale.max(1));
    image
        .save(path)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    Ok(())
}

fn render(result: &AnalysisResult, region_index: usize, scale: u32) -> RgbImage {
    let width = PANEL_WIDTH * scale;
    let panel_height = PANEL_HEIGHT * scale;
    let margin = MARGIN * scale;
    let mut image = RgbImage::from_pixel(width, panel_height * 2, BACKGROUND);

    let (brightness_mean, brightness_median) = series(result, region_index, |r| {
        (r.bg_sub_mean, r.bg_sub_median)
    });
    let (blue_mean, blue_median) = series(result, region_index, |r| (r.blue_mean, r.blue_median));

    let top = Panel {
        x0: margin,
        y0: margin / 2,
        width: width - margin * 2,
        height: panel_height - margin,
    };
    let bottom = Panel {
        x0: margin,
        y0: panel_height + margin / 2,
        width: width - margin * 2,
        height: panel_height - margin,
    };

    let band = rolling_band(&brightness_mean, ROLLING_WINDOW);
    let top_range = value_range(&[&brightness_mean, &brightness_median], Some(&band));
    draw_panel_frame(&mut image, &top);
    draw_band(&mut image, &top, &band, top_range);
    draw_series(&mut image, &top, &brightness_mean, top_range, MEAN_COLOR);
    draw_series(&mut image, &top, &brightness_median, top_range, MEDIAN_COLOR);

    let bottom_range = value_range(&[&blue_mean, &blue_median], None);
    draw_panel_frame(&mut image, &bottom);
    draw_series(&mut image, &bottom, &blue_mean, bottom_range, BLUE_MEAN_COLOR);
    draw_series(
        &mut image,
        &bottom,
        &blue_median,
        bottom_range,
        BLUE_MEDIAN_COLOR,
    );

    image
}

struct Panel {
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
}

impl Panel {
    fn x_for(&self, index: usize, len: usize) -> u32 {
        if len <= 1 {
            return self.x0 + self.width / 2;
        }
        self.x0 + (index as f64 / (len - 1) as f64 * (self.width - 1) as f64) as u32
    }

    fn y_for(&self, value: f32, range: (f32, f32)) -> u32 {
        let (min, max) = range;
        let span = (max - min).max(1e-6);
        let normalized = ((value - min) / span).clamp(0.0, 1.0);
        self.y0 + self.height - 1 - (normalized * (self.height - 1) as f32) as u32
    }
}

/// Per-frame values for one region; `None` where the frame is a gap.
fn series(
    result: &AnalysisResult,
    region_index: usize,
    pick: impl Fn(&crate::processing::StatRecord) -> (f32, f32),
) -> (Vec<Option<f32>>, Vec<Option<f32>>) {
    let mut first = Vec::with_capacity(result.rows.len());
    let mut second = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let values = match row {
            FrameResult::Stats { records, .. } => records
                .iter()
                .find(|r| r.region_index == region_index)
                .map(|r| pick(&r.record)),
            FrameResult::Gap { .. } => None,
        };
        first.push(values.map(|(a, _)| a));
        second.push(values.map(|(_, b)| b));
    }
    (first, second)
}

/// Rolling mean +/- one standard deviation over a centered window, skipping
/// gaps. Windows with fewer than two present values collapse to the point.
fn rolling_band(values: &[Option<f32>], window: usize) -> Vec<Option<(f32, f32)>> {
    let half = window / 2;
    values
        .iter()
        .enumerate()
        .map(|(i, center)| {
            let center = (*center)?;
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let present: Vec<f32> = values[lo..hi].iter().flatten().copied().collect();
            if present.len() < 2 {
                return Some((center, center));
            }
            let mean = present.iter().sum::<f32>() / present.len() as f32;
            let variance = present
                .iter()
                .map(|v| (v - mean) * (v - mean))
                .sum::<f32>()
                / present.len() as f32;
            let std = variance.sqrt();
            Some((mean - std, mean + std))
        })
        .collect()
}

fn value_range(series: &[&[Option<f32>]], band: Option<&[Option<(f32, f32)>]>) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for values in series {
        for value in values.iter().flatten() {
            min = min.min(*value);
            max = max.max(*value);
        }
    }
    if let Some(band) = band {
        for (lo, hi) in band.iter().flatten() {
            min = min.min(*lo);
            max = max.max(*hi);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    // Breathing room so lines never sit on the frame border.
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}

fn draw_panel_frame(image: &mut RgbImage, panel: &Panel) {
    for gx in 0..=4u32 {
        let x = panel.x0 + panel.width * gx / 4;
        draw_vertical(image, x, panel.y0, panel.y0 + panel.height - 1, GRID);
    }
    for gy in 0..=4u32 {
        let y = panel.y0 + panel.height * gy / 4;
        draw_horizontal(image, panel.x0, panel.x0 + panel.width - 1, y, GRID);
    }
    draw_horizontal(
        image,
        panel.x0,
        panel.x0 + panel.width - 1,
        panel.y0 + panel.height - 1,
        AXIS,
    );
    draw_vertical(image, panel.x0, panel.y0, panel.y0 + panel.height - 1, AXIS);
}

fn draw_band(
    image: &mut RgbImage,
    panel: &Panel,
    band: &[Option<(f32, f32)>],
    range: (f32, f32),
) {
    let len = band.len();
    for (i, entry) in band.iter().enumerate() {
        let Some((lo, hi)) = entry else { continue };
        let x = panel.x_for(i, len);
        let y_top = panel.y_for(*hi, range);
        let y_bottom = panel.y_for(*lo, range);
        draw_vertical(image, x, y_top, y_bottom, BAND_COLOR);
    }
}

fn draw_series(
    image: &mut RgbImage,
    panel: &Panel,
    values: &[Option<f32>],
    range: (f32, f32),
    color: Rgb<u8>,
) {
    let len = values.len();
    let mut previous: Option<(u32, u32)> = None;
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(value) => {
                let point = (panel.x_for(i, len), panel.y_for(*value, range));
                match previous {
                    Some(prev) => draw_line(image, prev, point, color),
                    None => put_pixel(image, point.0, point.1, color),
                }
                previous = Some(point);
            }
            // Gap: break the polyline.
            None => previous = None,
        }
    }
}

fn draw_line(image: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let (mut x0, mut y0) = (from.0 as i64, from.1 as i64);
    let (x1, y1) = (to.0 as i64, to.1 as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(image, x0 as u32, y0 as u32, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_horizontal(image: &mut RgbImage, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
    for x in x0..=x1 {
        put_pixel(image, x, y, color);
    }
}

fn draw_vertical(image: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..=y1 {
        put_pixel(image, x, y, color);
    }
}

fn put_pixel(image: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{FrameRange, RegionStats, StatRecord};
    use crate::region::{Rect, Region, RegionRole};
    use std::time::Duration;

    fn result_with(values: Vec<Option<f32>>) -> AnalysisResult {
        let rows: Vec<FrameResult> = values
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                Some(v) => FrameResult::Stats {
                    frame_index: i as u64,
                    background_level: None,
                    records: vec![RegionStats {
                        region_index: 0,
                        record: StatRecord {
                            raw_mean: *v,
                            raw_median: *v,
                            bg_sub_mean: *v,
                            bg_sub_median: *v,
                            blue_mean: *v * 0.5,
                            blue_median: *v * 0.5,
                            analyzed_pixel_count: 10,
                            total_pixel_count: 10,
                        },
                    }],
                },
                None => FrameResult::Gap {
                    frame_index: i as u64,
                },
            })
            .collect();
        AnalysisResult {
            range: FrameRange::new(0, rows.len() as u64 - 1),
            gap_count: rows.iter().filter(|r| r.is_gap()).count() as u64,
            rows,
            regions: vec![Region {
                rect: Rect {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                },
                role: RegionRole::Measurement,
                index: 0,
            }],
            fps: 25.0,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn render_produces_scaled_canvas() {
        let result = result_with(vec![Some(10.0), Some(20.0), Some(15.0)]);
        let image = render(&result, 0, 2);
        assert_eq!(image.width(), PANEL_WIDTH * 2);
        assert_eq!(image.height(), PANEL_HEIGHT * 2 * 2);
    }

    #[test]
    fn render_draws_series_pixels() {
        let result = result_with(vec![Some(10.0), Some(60.0), Some(35.0), Some(80.0)]);
        let image = render(&result, 0, 1);
        let painted = image
            .pixels()
            .filter(|p| **p == MEAN_COLOR || **p == MEDIAN_COLOR)
            .count();
        assert!(painted > 0);
    }

    #[test]
    fn render_survives_gaps_and_empty_runs() {
        let result = result_with(vec![None, Some(10.0), None, Some(12.0), None]);
        let image = render(&result, 0, 1);
        assert_eq!(image.width(), PANEL_WIDTH);

        let all_gaps = result_with(vec![None, None]);
        let image = render(&all_gaps, 0, 1);
        assert_eq!(image.height(), PANEL_HEIGHT * 2);
    }

    #[test]
    fn rolling_band_tracks_local_spread() {
        let values: Vec<Option<f32>> = (0..30).map(|i| Some((i % 5) as f32)).collect();
        let band = rolling_band(&values, 15);
        let (lo, hi) = band[15].unwrap();
        assert!(lo < 2.0 && hi > 2.0);
        assert!(hi - lo > 0.5);
    }
}
