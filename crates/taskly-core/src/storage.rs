//! Small file helpers shared by the JSON-backed stores.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "taskly".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Replace `path` with `contents` via a sibling temp file and a rename, so readers
/// only ever see the old or the new document.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let tmp = temp_path_for(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

/// Write `contents` only when `path` does not exist yet. Returns true if it wrote.
///
/// Safe against a concurrent writer: the document is staged in a temp file and
/// hard-linked into place, which fails instead of replacing a file that appeared
/// in the meantime.
pub fn init_if_missing(path: &Path, contents: &[u8]) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    ensure_parent_dir(path)?;
    let tmp = temp_path_for(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    let published = publish_new(&tmp, path, contents);
    let _ = fs::remove_file(&tmp);
    published
}

/// Link `tmp` to `path` unless `path` exists. Filesystems without hard links fall
/// back to an exclusive create.
fn publish_new(tmp: &Path, path: &Path, contents: &[u8]) -> io::Result<bool> {
    match fs::hard_link(tmp, path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(_) => match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(contents)?;
                file.sync_all()?;
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("doc.json");
        write_atomic(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn init_if_missing_keeps_existing_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        assert!(init_if_missing(&path, b"[]").expect("init"));
        fs::write(&path, b"[1]").expect("write");
        assert!(!init_if_missing(&path, b"[]").expect("init again"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "[1]");
    }

    #[test]
    fn publish_new_never_replaces_a_file_that_appeared_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        let tmp = dir.path().join(".doc.json.tmp");
        fs::write(&tmp, b"[]").expect("stage");
        // Another process saved its document after our existence check.
        fs::write(&path, br#"{"active":1}"#).expect("concurrent save");

        assert!(!publish_new(&tmp, &path, b"[]").expect("publish"));
        assert_eq!(fs::read_to_string(&path).expect("read"), r#"{"active":1}"#);
    }

    #[test]
    fn init_if_missing_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        assert!(init_if_missing(&path, b"[]").expect("init"));
        let names: Vec<String> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }
}
