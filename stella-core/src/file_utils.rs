//! File utility functions.

use crate::error::{Result, StellaError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find files with given extension in a directory, sorted by path.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(StellaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == extension {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Read a text file as UTF-8, falling back to Windows-1252.
///
/// OCR tools on Windows commonly save pasted stat blocks in the ANSI code page.
pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let bytes = e.into_bytes();
            let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&bytes);
            if had_errors {
                return Err(StellaError::Parse(format!(
                    "Failed to decode {} as UTF-8 or Windows-1252",
                    path.display()
                )));
            }
            Ok(text.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_text_file_falls_back_to_windows_1252() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.txt");
        // "Caf\xe9" is not valid UTF-8
        std::fs::write(&path, b"Caf\xe9 42").unwrap();
        assert_eq!(read_text_file(&path).unwrap(), "Caf\u{e9} 42");
    }

    #[test]
    fn test_find_files_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("nested").join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_files_with_extension(dir.path(), "json").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "json"));
    }

    #[test]
    fn test_find_files_missing_dir() {
        let err = find_files_with_extension(Path::new("/definitely/not/here"), "json").unwrap_err();
        assert!(matches!(err, StellaError::Io(_)));
    }
}
