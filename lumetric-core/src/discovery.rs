//! Video file discovery.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Extensions treated as analyzable video files, case-insensitive.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv", "m4v", "flv"];

/// Returns true when the path carries a recognized video extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Finds video files directly inside `dir`, sorted by file name.
///
/// Does not recurse. Returns [`CoreError::NoFilesFound`] when the directory
/// holds no recognized video files.
pub fn find_video_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_video_file(path))
        .collect();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }

    files.sort();
    Ok(files)
}

/// Resolves a user-supplied input path to the list of videos to process:
/// a file is taken as-is, a directory is scanned with [`find_video_files`].
pub fn resolve_input(input: &Path) -> CoreResult<Vec<PathBuf>> {
    if input.is_file() {
        if !is_video_file(input) {
            return Err(CoreError::InvalidConfig(format!(
                "not a recognized video file: {}",
                input.display()
            )));
        }
        return Ok(vec![input.to_path_buf()]);
    }
    find_video_files(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn recognizes_extensions_case_insensitively() {
        assert!(is_video_file(Path::new("a.mp4")));
        assert!(is_video_file(Path::new("b.MKV")));
        assert!(is_video_file(Path::new("c.MoV")));
        assert!(!is_video_file(Path::new("d.txt")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[test]
    fn finds_and_sorts_videos() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mkv", "a.mp4", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = find_video_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.mp4", "b.mkv"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        assert!(matches!(
            find_video_files(dir.path()),
            Err(CoreError::NoFilesFound)
        ));
    }

    #[test]
    fn resolve_input_accepts_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        File::create(&path).unwrap();
        assert_eq!(resolve_input(&path).unwrap(), vec![path]);
    }
}
