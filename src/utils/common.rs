//! Common utility functions used across the application

use std::path::Path;

/// Check if a file exists and has valid content (non-zero size)
pub async fn check_file_exists_and_valid(path: &Path) -> bool {
    if let Ok(metadata) = tokio::fs::metadata(path).await {
        if metadata.is_file() && metadata.len() > 0 {
            return true;
        }
    }
    false
}

/// Reject filenames that could escape the storage directory. Path-segment
/// routing already blocks `/`, but `..` and backslashes still have to be
/// filtered before joining.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_safe_filename() {
        assert!(is_safe_filename("abc123.wav"));
        assert!(is_safe_filename("b0e5f2c4.mp3"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a/b.wav"));
        assert!(!is_safe_filename("a\\b.wav"));
    }

    #[tokio::test]
    async fn test_check_file_exists_and_valid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.wav");
        assert!(!check_file_exists_and_valid(&missing).await);

        let empty = dir.path().join("empty.wav");
        std::fs::write(&empty, b"").unwrap();
        assert!(!check_file_exists_and_valid(&empty).await);

        let valid = dir.path().join("valid.wav");
        std::fs::write(&valid, b"RIFF").unwrap();
        assert!(check_file_exists_and_valid(&valid).await);
    }
}
