//! Small filesystem helpers shared by the file-backed stores (C1/C2).

use std::io;
use std::path::{Path, PathBuf};

/// Writes `body` to `path` atomically: the bytes land in a sibling temp file
/// first, then `rename` swaps it into place in one filesystem operation. A
/// concurrent reader can only ever observe `path` absent, at its previous
/// contents, or fully written at the new contents — never truncated or
/// partially written, unlike a plain `tokio::fs::write`.
pub async fn atomic_write(path: &Path, body: &[u8]) -> io::Result<()> {
    let tmp_path = sibling_tmp_path(path);
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, path).await
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
    path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_full_contents_and_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.json");

        atomic_write(&path, b"{\"a\":1}").await.unwrap();

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"{\"a\":1}");

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().into_string().unwrap());
        }
        assert_eq!(names, vec!["entry.json".to_string()]);
    }

    #[tokio::test]
    async fn overwrites_existing_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.json");

        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"second");
    }
}
