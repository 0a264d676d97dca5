//! Writing into the output tree
//!
//! Large outputs are written to a temporary file in the destination directory
//! and renamed into place, so an interrupted run never leaves a truncated file
//! that a resumed run would mistake for a finished one.

use crate::error::{PipelineError, PipelineResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Outputs larger than this are written atomically
pub const DEFAULT_ATOMIC_THRESHOLD: usize = 64 * 1024;

/// Create the parent directory of `path` if needed
pub fn ensure_parent(path: &Path) -> PipelineResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(PipelineError::io(parent))
        }
        _ => Ok(()),
    }
}

/// Directory that holds `dest`, where its temporary sibling is created
fn sibling_dir(dest: &Path) -> &Path {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn persist(tmp: NamedTempFile, dest: &Path) -> PipelineResult<()> {
    tmp.persist(dest)
        .map_err(|e| PipelineError::io(dest)(e.error))?;
    Ok(())
}

/// Write `contents` to `dest`, atomically when larger than `atomic_threshold`
pub fn write_output(dest: &Path, contents: &[u8], atomic_threshold: usize) -> PipelineResult<()> {
    ensure_parent(dest)?;

    if contents.len() <= atomic_threshold {
        return fs::write(dest, contents).map_err(PipelineError::io(dest));
    }

    let dir = sibling_dir(dest);
    let mut tmp = NamedTempFile::new_in(dir).map_err(PipelineError::io(dir))?;
    tmp.write_all(contents).map_err(PipelineError::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(PipelineError::io(dest))?;
    persist(tmp, dest)
}

/// Byte-for-byte copy keeping permissions and modification time
///
/// Sources larger than `atomic_threshold` are copied into a temporary
/// sibling of `dest` and renamed into place.
pub fn copy_preserving(source: &Path, dest: &Path, atomic_threshold: usize) -> PipelineResult<()> {
    ensure_parent(dest)?;
    let meta = fs::metadata(source).map_err(PipelineError::io(source))?;
    let modified = meta.modified().map_err(PipelineError::io(source))?;

    if meta.len() <= atomic_threshold as u64 {
        fs::copy(source, dest).map_err(PipelineError::io(source))?;
        return File::options()
            .write(true)
            .open(dest)
            .and_then(|file| file.set_modified(modified))
            .map_err(PipelineError::io(dest));
    }

    let dir = sibling_dir(dest);
    let mut tmp = NamedTempFile::new_in(dir).map_err(PipelineError::io(dir))?;
    let mut reader = File::open(source).map_err(PipelineError::io(source))?;
    io::copy(&mut reader, &mut tmp).map_err(PipelineError::io(source))?;

    let file = tmp.as_file();
    file.sync_all()
        .and_then(|_| file.set_permissions(meta.permissions()))
        .and_then(|_| file.set_modified(modified))
        .map_err(PipelineError::io(dest))?;
    persist(tmp, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_small_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a").join("b").join("Main.java");
        write_output(&dest, b"class Main {}", DEFAULT_ATOMIC_THRESHOLD).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"class Main {}");
    }

    #[test]
    fn test_large_write_is_renamed_into_place() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out").join("Big.java");
        let contents = vec![b'x'; 1024];
        write_output(&dest, &contents, 16).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), contents);
        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path() != dest)
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind");
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("A.java");
        fs::write(&dest, "old").unwrap();
        write_output(&dest, b"new contents", 4).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new contents");
    }

    #[test]
    fn test_copy_preserves_bytes_and_mtime() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        fs::write(&source, [0u8, 159, 146, 150, 255]).unwrap();
        let past = SystemTime::now() - Duration::from_secs(86_400);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let dest = dir.path().join("copy").join("logo.png");
        copy_preserving(&source, &dest, DEFAULT_ATOMIC_THRESHOLD).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), fs::read(&source).unwrap());
        let copied = fs::metadata(&dest).unwrap().modified().unwrap();
        let original = fs::metadata(&source).unwrap().modified().unwrap();
        assert_eq!(copied, original);
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let err = copy_preserving(&dir.path().join("nope"), &dir.path().join("out"), 16).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_large_copy_is_renamed_into_place() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.bin");
        let contents: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(&source, &contents).unwrap();
        let past = SystemTime::now() - Duration::from_secs(3_600);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let dest = dir.path().join("out").join("data.bin");
        copy_preserving(&source, &dest, 16).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), contents);
        assert_eq!(
            fs::metadata(&dest).unwrap().modified().unwrap(),
            fs::metadata(&source).unwrap().modified().unwrap()
        );
        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path() != dest)
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind");
    }

    #[test]
    fn test_large_copy_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.bin");
        fs::write(&source, vec![7u8; 512]).unwrap();
        let dest = dir.path().join("data.copy");
        fs::write(&dest, "stale").unwrap();

        copy_preserving(&source, &dest, 16).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), vec![7u8; 512]);
    }
}
