//! Contains utilities for locating capture files.
use std::path::{Path, PathBuf};
use glob::{MatchOptions, Pattern};
use crate::config::CAPTURE_EXTENSIONS;
use crate::error::{HasshError, Result};

/// Lists the capture files directly inside `directory`, sorted by path.
///
/// Hidden files and subdirectories are skipped.
pub fn list_capture_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(HasshError::Capture(format!("cannot read directory {}", directory.display())));
    }

    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let base = Pattern::escape(&directory.to_string_lossy());

    let mut files = Vec::new();
    for extension in CAPTURE_EXTENSIONS {
        let pattern = Path::new(&base).join(format!("*.{extension}"));
        let paths = glob::glob_with(&pattern.to_string_lossy(), options)
            .map_err(|e| HasshError::Capture(format!("bad pattern {}: {e}", pattern.display())))?;

        for path in paths {
            let path = path.map_err(|e| HasshError::Capture(e.to_string()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();

    log::info!("Found {} capture files in {}", files.len(), directory.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_only_visible_capture_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pcapng", "a.pcap", "c.cap", ".hidden.pcap", "readme.md", "pcap", "notes.pcap.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("nested.pcap")).unwrap();

        let files = list_capture_files(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["a.pcap", "b.pcapng", "c.cap"]);
    }

    #[test]
    fn directory_names_are_not_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let captures = dir.path().join("day[1]");
        fs::create_dir(&captures).unwrap();
        File::create(captures.join("ssh.pcap")).unwrap();

        let files = list_capture_files(&captures).unwrap();
        assert_eq!(names(&files), vec!["ssh.pcap"]);
    }

    #[test]
    fn missing_directory_is_a_capture_fault() {
        let dir = tempfile::tempdir().unwrap();
        let error = list_capture_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(error, HasshError::Capture(_)));
    }
}
