//! Command implementations for the CLI.

pub mod analyze;
pub mod detect_beeps;
pub mod detect_range;
pub mod info;

use std::error::Error;
use std::path::Path;

use lumetric_core::{Rect, Region, RegionRole, RunConfig};

pub type CliResult = Result<(), Box<dyn Error>>;

/// Parses a rectangle given on the command line as `x,y,width,height`.
pub fn parse_rect(spec: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected x,y,width,height, got '{spec}'"
        ));
    }
    let mut values = [0u32; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("invalid number '{part}' in '{spec}'"))?;
    }
    Ok(Rect::new(values[0], values[1], values[2], values[3]))
}

/// Builds the region set from `--region`/`--background` flags or a JSON file.
pub fn build_regions(
    region_specs: &[String],
    background_spec: Option<&str>,
    regions_file: Option<&Path>,
) -> Result<Vec<Region>, Box<dyn Error>> {
    if let Some(path) = regions_file {
        let text = std::fs::read_to_string(path)?;
        let regions: Vec<Region> = serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
        return Ok(regions);
    }

    let mut regions = Vec::new();
    for (index, spec) in region_specs.iter().enumerate() {
        regions.push(Region::new(parse_rect(spec)?, RegionRole::Measurement, index));
    }
    if let Some(spec) = background_spec {
        regions.push(Region::new(
            parse_rect(spec)?,
            RegionRole::Background,
            regions.len(),
        ));
    }
    if regions.is_empty() {
        return Err("no regions given; use --region, --background, or --regions-file".into());
    }
    Ok(regions)
}

/// Loads the run configuration, falling back to defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// A full-frame measurement region, for commands where regions are optional.
pub fn full_frame_region(width: u32, height: u32) -> Region {
    Region::new(Rect::new(0, 0, width, height), RegionRole::Measurement, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rect_accepts_spaces() {
        assert_eq!(parse_rect("10, 20, 30, 40").unwrap(), Rect::new(10, 20, 30, 40));
    }

    #[test]
    fn parse_rect_rejects_garbage() {
        assert!(parse_rect("10,20,30").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
        assert!(parse_rect("10,20,30,-5").is_err());
    }

    #[test]
    fn build_regions_assigns_roles_and_indices() {
        let regions = build_regions(
            &["0,0,10,10".to_string(), "20,0,10,10".to_string()],
            Some("40,0,8,8"),
            None,
        )
        .unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].role, RegionRole::Measurement);
        assert_eq!(regions[1].index, 1);
        assert_eq!(regions[2].role, RegionRole::Background);
        assert_eq!(regions[2].index, 2);
    }

    #[test]
    fn build_regions_requires_at_least_one() {
        assert!(build_regions(&[], None, None).is_err());
    }

    #[test]
    fn build_regions_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        let regions = vec![
            Region::new(Rect::new(1, 2, 3, 4), RegionRole::Measurement, 0),
            Region::new(Rect::new(5, 6, 7, 8), RegionRole::Background, 1),
        ];
        std::fs::write(&path, serde_json::to_string(&regions).unwrap()).unwrap();

        let loaded = build_regions(&[], None, Some(&path)).unwrap();
        assert_eq!(loaded, regions);
    }
}
