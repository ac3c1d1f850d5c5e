//! Region-of-interest model.
//!
//! Regions are drawn and edited by an external ROI manager (the UI layer).
//! The core only consumes immutable snapshots taken at run start, so in-flight
//! edits cannot race an analysis.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Maximum number of simultaneously defined regions.
pub const MAX_REGIONS: usize = 8;

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered by the rectangle.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Role a region plays during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionRole {
    /// Brightness is measured and exported for this region.
    Measurement,
    /// This region provides the background level subtracted from measurements.
    Background,
}

/// Snapshot of one user-defined region, valid for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    pub role: RegionRole,
    /// Stable identity within a session (0..MAX_REGIONS).
    pub index: usize,
}

impl Region {
    pub fn new(rect: Rect, role: RegionRole, index: usize) -> Self {
        Self { rect, role, index }
    }

    /// Validates the region against the frame dimensions it will be read from.
    ///
    /// Rejected regions abort the run before any frame is processed.
    pub fn validate(&self, frame_width: u32, frame_height: u32) -> CoreResult<()> {
        if self.index >= MAX_REGIONS {
            return Err(CoreError::InvalidRegion {
                region_index: self.index,
                msg: format!("region index exceeds maximum of {}", MAX_REGIONS - 1),
            });
        }
        if self.rect.width == 0 || self.rect.height == 0 {
            return Err(CoreError::InvalidRegion {
                region_index: self.index,
                msg: "region has zero width or height".to_string(),
            });
        }
        let right = u64::from(self.rect.x) + u64::from(self.rect.width);
        let bottom = u64::from(self.rect.y) + u64::from(self.rect.height);
        if right > u64::from(frame_width) || bottom > u64::from(frame_height) {
            return Err(CoreError::InvalidRegion {
                region_index: self.index,
                msg: format!(
                    "region {}x{}+{}+{} extends outside {}x{} frame",
                    self.rect.width,
                    self.rect.height,
                    self.rect.x,
                    self.rect.y,
                    frame_width,
                    frame_height
                ),
            });
        }
        Ok(())
    }
}

/// Validates a run's region snapshots as a set.
///
/// Requires at least one measurement region and at most one background region.
pub fn validate_regions(regions: &[Region], frame_width: u32, frame_height: u32) -> CoreResult<()> {
    if !regions
        .iter()
        .any(|r| r.role == RegionRole::Measurement)
    {
        return Err(CoreError::InvalidConfig(
            "at least one measurement region is required".to_string(),
        ));
    }
    let background_count = regions
        .iter()
        .filter(|r| r.role == RegionRole::Background)
        .count();
    if background_count > 1 {
        return Err(CoreError::InvalidConfig(format!(
            "at most one background region is allowed, found {background_count}"
        )));
    }
    for region in regions {
        region.validate(frame_width, frame_height)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_inside_frame_validates() {
        let region = Region::new(Rect::new(10, 10, 100, 50), RegionRole::Measurement, 0);
        assert!(region.validate(1920, 1080).is_ok());
    }

    #[test]
    fn region_outside_frame_is_rejected() {
        let region = Region::new(Rect::new(1900, 10, 100, 50), RegionRole::Measurement, 0);
        let err = region.validate(1920, 1080).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidRegion { region_index: 0, .. }
        ));
    }

    #[test]
    fn zero_sized_region_is_rejected() {
        let region = Region::new(Rect::new(0, 0, 0, 50), RegionRole::Measurement, 1);
        assert!(region.validate(1920, 1080).is_err());
    }

    #[test]
    fn two_background_regions_are_rejected() {
        let regions = vec![
            Region::new(Rect::new(0, 0, 10, 10), RegionRole::Measurement, 0),
            Region::new(Rect::new(20, 0, 10, 10), RegionRole::Background, 1),
            Region::new(Rect::new(40, 0, 10, 10), RegionRole::Background, 2),
        ];
        assert!(validate_regions(&regions, 100, 100).is_err());
    }
}
