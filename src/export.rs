//! Local copies of generated artifacts.
//!
//! Files land at `{dir}/{client_id}/{filename}`, next to the data a human
//! would want to inspect when a remote upload looks wrong.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Write `content` to `{dir}/{client_id}/{filename}`, creating directories.
pub fn save_to_client_directory(
    dir: &Path,
    client_id: &str,
    filename: &str,
    content: &[u8],
) -> Result<PathBuf> {
    let target_dir = dir.join(client_id);
    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("Failed to create export dir: {}", target_dir.display()))?;

    let path = target_dir.join(filename);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(client_id, filename, path = %path.display(), "saved local copy");
    Ok(path)
}

/// Pretty-print `value` as JSON and save it like [`save_to_client_directory`].
pub fn save_json_to_client_directory<T: Serialize + ?Sized>(
    dir: &Path,
    client_id: &str,
    filename: &str,
    value: &T,
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    save_to_client_directory(dir, client_id, filename, json.as_bytes())
}

/// `report.csv` → `report_metadata.json`
pub fn metadata_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    format!("{}_metadata.json", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_client_dir() {
        let tmp = TempDir::new().unwrap();
        let path = save_to_client_directory(tmp.path(), "acme", "report.csv", b"a,b\n").unwrap();

        assert_eq!(path, tmp.path().join("acme").join("report.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }

    #[test]
    fn test_save_overwrites() {
        let tmp = TempDir::new().unwrap();
        save_to_client_directory(tmp.path(), "acme", "r.csv", b"old").unwrap();
        let path = save_to_client_directory(tmp.path(), "acme", "r.csv", b"new").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "new");
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let tmp = TempDir::new().unwrap();
        let path =
            save_json_to_client_directory(tmp.path(), "acme", "m.json", &json!({"a": 1})).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_metadata_filename() {
        assert_eq!(metadata_filename("report.csv"), "report_metadata.json");
        assert_eq!(metadata_filename("noext"), "noext_metadata.json");
    }
}
