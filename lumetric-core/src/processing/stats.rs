//! Batch statistics over masked region pixels.
//!
//! Pure transforms from a region's pixel block to a [`StatRecord`]. All
//! arithmetic stays in floating point; rounding to two decimals happens only
//! at the export boundary, never here.

use crate::config::FilterConfig;
use crate::processing::mask::RegionMask;

/// Per (frame, region) brightness statistics.
///
/// When `analyzed_pixel_count` is zero every statistic is defined as 0.0;
/// no field is ever NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatRecord {
    /// Mean L* over masked pixels (0-100).
    pub raw_mean: f32,
    /// Median L* over masked pixels (0-100).
    pub raw_median: f32,
    /// Mean of background-subtracted L*, each pixel clamped at 0.
    pub bg_sub_mean: f32,
    /// Median of background-subtracted L*, each pixel clamped at 0.
    pub bg_sub_median: f32,
    /// Mean blue channel over the same mask (0-255).
    pub blue_mean: f32,
    /// Median blue channel over the same mask (0-255).
    pub blue_median: f32,
    pub analyzed_pixel_count: u64,
    pub total_pixel_count: u64,
}

impl StatRecord {
    /// The defined zero record for an empty mask.
    pub fn zero(total_pixel_count: u64) -> Self {
        Self {
            total_pixel_count,
            ..Self::default()
        }
    }
}

/// Arithmetic mean. Empty input yields 0.0.
pub(crate) fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    (sum / values.len() as f64) as f32
}

/// Median via sorting. Empty input yields 0.0.
pub(crate) fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Linear-interpolation percentile (numpy semantics). Empty input yields 0.0.
pub(crate) fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p = p.clamp(0.0, 100.0);
    let rank = (p / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f32;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Computes the [`StatRecord`] for one region mask.
///
/// The mask and planes come from the mask engine; this function only
/// aggregates.
pub fn compute_from_mask(mask: &RegionMask, background_brightness: Option<f32>) -> StatRecord {
    let total = mask.total_pixel_count();

    let masked_lightness: Vec<f32> = mask
        .lightness
        .iter()
        .zip(mask.mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&l, _)| l)
        .collect();
    if masked_lightness.is_empty() {
        return StatRecord::zero(total);
    }
    let masked_blue: Vec<f32> = mask
        .blue
        .iter()
        .zip(mask.mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&b, _)| b)
        .collect();

    let background = background_brightness.unwrap_or(0.0);
    let bg_subtracted: Vec<f32> = masked_lightness
        .iter()
        .map(|&l| (l - background).max(0.0))
        .collect();

    StatRecord {
        raw_mean: mean(&masked_lightness),
        raw_median: median(&masked_lightness),
        bg_sub_mean: mean(&bg_subtracted),
        bg_sub_median: median(&bg_subtracted),
        blue_mean: mean(&masked_blue),
        blue_median: median(&masked_blue),
        analyzed_pixel_count: masked_lightness.len() as u64,
        total_pixel_count: total,
    }
}

/// Convenience wrapper: mask a raw pixel block and aggregate in one step.
pub fn compute(
    region_rgb: &[u8],
    width: u32,
    height: u32,
    background_brightness: Option<f32>,
    filter: &FilterConfig,
) -> StatRecord {
    let mask = crate::processing::mask::build_mask(
        region_rgb,
        width,
        height,
        background_brightness,
        filter,
    );
    compute_from_mask(&mask, background_brightness)
}

/// Representative background level of a background-region pixel block: the
/// configured percentile of its lightness values, not the mean.
pub fn background_level(region_rgb: &[u8], filter: &FilterConfig) -> f32 {
    let lightness = crate::processing::mask::lightness_plane(region_rgb);
    percentile(&lightness, filter.background_percentile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_gray_block(level: u8, pixels: usize) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            rgb.extend_from_slice(&[level, level, level]);
        }
        rgb
    }

    fn permissive_filter() -> FilterConfig {
        FilterConfig {
            kernel_radius: 0,
            noise_floor: 0.0,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn empty_mask_yields_zero_record() {
        // All-black block with a positive noise floor masks out everything.
        let rgb = uniform_gray_block(0, 16);
        let filter = FilterConfig {
            kernel_radius: 0,
            noise_floor: 2.0,
            ..FilterConfig::default()
        };
        let record = compute(&rgb, 4, 4, Some(50.0), &filter);
        assert_eq!(record, StatRecord::zero(16));
        assert!(!record.raw_mean.is_nan());
    }

    #[test]
    fn uniform_block_mean_equals_median() {
        let rgb = uniform_gray_block(200, 16);
        let record = compute(&rgb, 4, 4, None, &permissive_filter());
        assert_eq!(record.analyzed_pixel_count, 16);
        assert!((record.raw_mean - record.raw_median).abs() < 1e-4);
        assert!(record.raw_mean > 70.0 && record.raw_mean < 90.0);
        assert_eq!(record.blue_mean, 200.0);
    }

    #[test]
    fn bg_sub_is_clamped_and_bounded_by_raw() {
        let rgb = uniform_gray_block(128, 16);
        let record = compute(&rgb, 4, 4, Some(95.0), &permissive_filter());
        assert!(record.bg_sub_mean >= 0.0);
        assert!(record.bg_sub_mean <= record.raw_mean);
        // Background above every pixel clamps the whole block to zero.
        assert_eq!(record.bg_sub_mean, 0.0);
        assert_eq!(record.bg_sub_median, 0.0);
    }

    #[test]
    fn absent_background_makes_bg_sub_equal_raw() {
        let rgb = uniform_gray_block(180, 16);
        let record = compute(&rgb, 4, 4, None, &permissive_filter());
        assert_eq!(record.bg_sub_mean, record.raw_mean);
        assert_eq!(record.bg_sub_median, record.raw_median);
    }

    #[test]
    fn background_level_uses_percentile_not_mean() {
        // Block of 99 dark pixels and one bright pixel: the 90th percentile
        // sits well below the bright outlier's pull on a max, and well above
        // the mean of a min.
        let mut rgb = uniform_gray_block(10, 99);
        rgb.extend_from_slice(&[255, 255, 255]);
        let filter = FilterConfig {
            background_percentile: 50.0,
            ..FilterConfig::default()
        };
        let level = background_level(&rgb, &filter);
        let dark = crate::processing::mask::lightness_plane(&uniform_gray_block(10, 1))[0];
        assert!((level - dark).abs() < 0.5);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [0.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

}
