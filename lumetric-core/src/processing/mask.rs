//! Analyzed-pixel mask construction.
//!
//! Converts rgb24 pixel blocks into a perceptual lightness plane (CIE L*,
//! 0-100) and a blue-channel plane, derives a binary inclusion mask from the
//! noise floor and background level, and cleans it up with a morphological
//! opening followed by closing. A captured "fixed" mask can be reused across
//! a whole run to avoid frame-to-frame mask flicker.

use crate::config::FilterConfig;

/// Lightness/blue planes plus the inclusion mask for one region block.
#[derive(Debug, Clone)]
pub struct RegionMask {
    pub width: u32,
    pub height: u32,
    pub mask: Vec<bool>,
    pub lightness: Vec<f32>,
    pub blue: Vec<f32>,
}

impl RegionMask {
    /// Number of pixels included in the mask.
    pub fn analyzed_pixel_count(&self) -> u64 {
        self.mask.iter().filter(|&&m| m).count() as u64
    }

    pub fn total_pixel_count(&self) -> u64 {
        self.mask.len() as u64
    }
}

/// Mask reuse policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Recompute the mask for every frame.
    Ephemeral,
    /// Capture the mask once from the first processed frame per region and
    /// reuse it unchanged for the rest of the run.
    Fixed,
}

/// Converts one sRGB pixel to CIE L* (0-100, D65 white).
fn srgb_to_lightness(r: u8, g: u8, b: u8) -> f32 {
    fn linearize(c: u8) -> f32 {
        let c = f32::from(c) / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    let y = 0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b);
    // CIE lightness function, linear below the (6/29)^3 knee.
    if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    }
}

/// Converts a packed rgb24 block into its L* plane (0-100).
pub fn lightness_plane(rgb: &[u8]) -> Vec<f32> {
    rgb.chunks_exact(3)
        .map(|px| srgb_to_lightness(px[0], px[1], px[2]))
        .collect()
}

/// Extracts the blue channel of a packed rgb24 block as f32 (0-255).
pub fn blue_plane(rgb: &[u8]) -> Vec<f32> {
    rgb.chunks_exact(3).map(|px| f32::from(px[2])).collect()
}

/// Offsets of the elliptical (disc) structuring element of `radius`.
fn disc_offsets(radius: u32) -> Vec<(i64, i64)> {
    let r = radius as i64;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn erode(mask: &[bool], width: usize, height: usize, offsets: &[(i64, i64)]) -> Vec<bool> {
    let mut out = vec![false; mask.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            // Out-of-bounds neighbours count as set so borders don't shrink.
            let keep = offsets.iter().all(|&(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    true
                } else {
                    mask[ny as usize * width + nx as usize]
                }
            });
            out[y as usize * width as usize + x as usize] = keep;
        }
    }
    out
}

fn dilate(mask: &[bool], width: usize, height: usize, offsets: &[(i64, i64)]) -> Vec<bool> {
    let mut out = vec![false; mask.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let hit = offsets.iter().any(|&(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    false
                } else {
                    mask[ny as usize * width + nx as usize]
                }
            });
            out[y as usize * width as usize + x as usize] = hit;
        }
    }
    out
}

/// Morphological opening then closing with an elliptical kernel.
///
/// Radius 0 is the identity: the mask passes through untouched.
pub fn clean_mask(mask: Vec<bool>, width: u32, height: u32, radius: u32) -> Vec<bool> {
    if radius == 0 {
        return mask;
    }
    let offsets = disc_offsets(radius);
    let (w, h) = (width as usize, height as usize);
    // Opening removes isolated noise pixels, closing fills small gaps.
    let opened = dilate(&erode(&mask, w, h, &offsets), w, h, &offsets);
    erode(&dilate(&opened, w, h, &offsets), w, h, &offsets)
}

/// Builds the inclusion mask for one region pixel block.
///
/// A pixel is included when its lightness exceeds the noise floor and, if a
/// background level is present, also exceeds that level. Morphology then
/// cleans the result per `filter.kernel_radius`.
pub fn build_mask(
    region_rgb: &[u8],
    width: u32,
    height: u32,
    background_brightness: Option<f32>,
    filter: &FilterConfig,
) -> RegionMask {
    let lightness = lightness_plane(region_rgb);
    let blue = blue_plane(region_rgb);

    let mask: Vec<bool> = lightness
        .iter()
        .map(|&l| {
            l > filter.noise_floor
                && background_brightness.map_or(true, |bg| l > bg)
        })
        .collect();
    let mask = clean_mask(mask, width, height, filter.kernel_radius);

    RegionMask {
        width,
        height,
        mask,
        lightness,
        blue,
    }
}

/// Per-run mask state: reuse policy plus any captured fixed masks.
///
/// A [`FilterConfig`] change invalidates every captured mask and forces
/// recapture on the next frame.
#[derive(Debug)]
pub struct MaskEngine {
    mode: MaskMode,
    filter: FilterConfig,
    captured: std::collections::HashMap<usize, Vec<bool>>,
}

impl MaskEngine {
    pub fn new(mode: MaskMode, filter: FilterConfig) -> Self {
        Self {
            mode,
            filter,
            captured: std::collections::HashMap::new(),
        }
    }

    pub fn mode(&self) -> MaskMode {
        self.mode
    }

    /// Replaces the filter configuration, dropping captured masks when it
    /// actually changed.
    pub fn set_filter(&mut self, filter: FilterConfig) {
        if filter != self.filter {
            self.captured.clear();
            self.filter = filter;
        }
    }

    /// In fixed mode, captures `region_index`'s mask from this pixel block
    /// unless one is already held. No-op in ephemeral mode.
    pub fn capture_if_needed(
        &mut self,
        region_index: usize,
        region_rgb: &[u8],
        width: u32,
        height: u32,
        background_brightness: Option<f32>,
    ) {
        if self.mode != MaskMode::Fixed || self.captured.contains_key(&region_index) {
            return;
        }
        let mask = build_mask(region_rgb, width, height, background_brightness, &self.filter);
        self.captured.insert(region_index, mask.mask);
    }

    /// Whether fixed masks are held for every region in `region_indices`.
    /// Always true in ephemeral mode.
    pub fn fully_captured(&self, region_indices: &[usize]) -> bool {
        self.mode != MaskMode::Fixed
            || region_indices
                .iter()
                .all(|idx| self.captured.contains_key(idx))
    }

    /// Produces the mask for `region_index`'s pixel block on the current
    /// frame, honouring the reuse policy.
    ///
    /// In fixed mode a captured mask of matching size is reused unchanged; a
    /// size mismatch (region resized between runs) falls back to a fresh
    /// per-frame mask.
    pub fn mask_for_region(
        &self,
        region_index: usize,
        region_rgb: &[u8],
        width: u32,
        height: u32,
        background_brightness: Option<f32>,
    ) -> RegionMask {
        if self.mode == MaskMode::Fixed {
            if let Some(mask) = self.captured.get(&region_index) {
                if mask.len() == (width as usize) * (height as usize) {
                    return RegionMask {
                        width,
                        height,
                        mask: mask.clone(),
                        lightness: lightness_plane(region_rgb),
                        blue: blue_plane(region_rgb),
                    };
                }
            }
        }
        build_mask(region_rgb, width, height, background_brightness, &self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_is_zero_lightness_white_is_hundred() {
        assert!(srgb_to_lightness(0, 0, 0).abs() < 0.01);
        assert!((srgb_to_lightness(255, 255, 255) - 100.0).abs() < 0.01);
    }

    #[test]
    fn lightness_is_monotonic_in_gray_level() {
        let low = srgb_to_lightness(50, 50, 50);
        let high = srgb_to_lightness(200, 200, 200);
        assert!(high > low);
    }

    #[test]
    fn radius_zero_morphology_is_identity() {
        let mask = vec![true, false, true, false, true, false, true, false, true];
        let cleaned = clean_mask(mask.clone(), 3, 3, 0);
        assert_eq!(cleaned, mask);
    }

    #[test]
    fn opening_removes_isolated_pixel() {
        // Single set pixel in a 7x7 field disappears under radius-1 opening.
        let mut mask = vec![false; 49];
        mask[3 * 7 + 3] = true;
        let cleaned = clean_mask(mask, 7, 7, 1);
        assert!(cleaned.iter().all(|&m| !m));
    }

    #[test]
    fn solid_block_survives_morphology() {
        // 5x5 solid block in a 9x9 field keeps its core under radius 1.
        let mut mask = vec![false; 81];
        for y in 2..7 {
            for x in 2..7 {
                mask[y * 9 + x] = true;
            }
        }
        let cleaned = clean_mask(mask, 9, 9, 1);
        assert!(cleaned[4 * 9 + 4]);
    }

    #[test]
    fn noise_floor_excludes_dark_pixels() {
        // One black pixel, one white pixel.
        let rgb = [0u8, 0, 0, 255, 255, 255];
        let filter = FilterConfig {
            kernel_radius: 0,
            noise_floor: 2.0,
            ..FilterConfig::default()
        };
        let mask = build_mask(&rgb, 2, 1, None, &filter);
        assert_eq!(mask.mask, vec![false, true]);
        assert_eq!(mask.analyzed_pixel_count(), 1);
    }

    #[test]
    fn background_level_tightens_mask() {
        let rgb = [128u8, 128, 128, 255, 255, 255];
        let filter = FilterConfig {
            kernel_radius: 0,
            noise_floor: 0.0,
            ..FilterConfig::default()
        };
        let unmasked = build_mask(&rgb, 2, 1, None, &filter);
        assert_eq!(unmasked.analyzed_pixel_count(), 2);
        let masked = build_mask(&rgb, 2, 1, Some(80.0), &filter);
        assert_eq!(masked.mask, vec![false, true]);
    }

    #[test]
    fn fixed_mode_reuses_captured_mask() {
        let filter = FilterConfig {
            kernel_radius: 0,
            noise_floor: 2.0,
            ..FilterConfig::default()
        };
        let mut engine = MaskEngine::new(MaskMode::Fixed, filter);

        let bright = [255u8, 255, 255, 255, 255, 255];
        engine.capture_if_needed(0, &bright, 2, 1, None);
        assert!(engine.fully_captured(&[0]));
        let first = engine.mask_for_region(0, &bright, 2, 1, None);
        assert_eq!(first.analyzed_pixel_count(), 2);

        // Same region on a dark frame keeps the captured mask.
        let dark = [0u8, 0, 0, 0, 0, 0];
        let second = engine.mask_for_region(0, &dark, 2, 1, None);
        assert_eq!(second.mask, first.mask);
    }

    #[test]
    fn filter_change_invalidates_captured_mask() {
        let filter = FilterConfig {
            kernel_radius: 0,
            noise_floor: 2.0,
            ..FilterConfig::default()
        };
        let mut engine = MaskEngine::new(MaskMode::Fixed, filter);

        let bright = [255u8, 255, 255, 255, 255, 255];
        engine.capture_if_needed(0, &bright, 2, 1, None);

        engine.set_filter(FilterConfig {
            noise_floor: 5.0,
            ..filter
        });
        assert!(!engine.fully_captured(&[0]));

        // Recapture happens from the current (dark) frame.
        let dark = [0u8, 0, 0, 0, 0, 0];
        engine.capture_if_needed(0, &dark, 2, 1, None);
        let recaptured = engine.mask_for_region(0, &dark, 2, 1, None);
        assert_eq!(recaptured.analyzed_pixel_count(), 0);
    }
}
