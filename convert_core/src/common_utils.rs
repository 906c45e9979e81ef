//! Common path helpers shared by the collector and the batch runner.

use crate::errors::{ConvertError, Result};
use std::path::Path;

/// File extension, lowercased. Empty string if the path has none.
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension membership test.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

/// Base filename as a lossy string. Empty string for paths like `/` or `..`.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create a directory (and parents) if it does not already exist.
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| ConvertError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })
}

/// Case-insensitive path equality, used to decide whether a replace-mode
/// output actually collides with its input (e.g. `IMG.HEIC` vs `img.png`
/// never collide; `a.png` converted to `a.PNG` on a case-insensitive
/// filesystem does).
pub fn same_path_case_insensitive(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_get_extension_lowercase() {
        assert_eq!(get_extension_lowercase(Path::new("a.HEIC")), "heic");
        assert_eq!(get_extension_lowercase(Path::new("a.heif")), "heif");
        assert_eq!(get_extension_lowercase(Path::new("noext")), "");
    }

    #[test]
    fn test_has_extension() {
        let exts = &["heic", "heif"];
        assert!(has_extension(Path::new("IMG_0001.HeIc"), exts));
        assert!(!has_extension(Path::new("image.heics"), exts));
    }

    #[test]
    fn test_same_path_case_insensitive() {
        assert!(same_path_case_insensitive(
            Path::new("/a/IMG.png"),
            Path::new("/a/img.PNG")
        ));
        assert!(!same_path_case_insensitive(
            Path::new("/a/img.heic"),
            Path::new("/a/img.png")
        ));
    }
}
