//! Append-only audit log of every translated unit
//!
//! One `original<TAB>translation` line per backend translation, so a reviewer
//! can build a terminology glossary from a run.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

const HEADER: &str = "# original\ttranslation\n";

#[derive(Debug)]
pub struct GlossaryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl GlossaryLog {
    /// Open (or create) the log at `path`, writing the header to a new file
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(HEADER.as_bytes())?;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one pair; failures are logged and otherwise ignored
    pub fn append(&self, original: &str, translation: &str) {
        let line = format!("{}\t{}\n", escape(original), escape(translation));

        let result = self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(line.as_bytes());

        if let Err(e) = result {
            warn!("Failed to append to glossary {}: {}", self.path.display(), e);
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("glossary.tsv");
        let log = GlossaryLog::open(&path).unwrap();
        log.append("привет", "hello");
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# original\ttranslation\nпривет\thello\n");
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glossary.tsv");
        GlossaryLog::open(&path).unwrap().append("один", "one");
        GlossaryLog::open(&path).unwrap().append("два", "two");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("# original").count(), 1);
        assert!(content.ends_with("один\tone\nдва\ttwo\n"));
    }

    #[test]
    fn test_entries_are_single_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glossary.tsv");
        let log = GlossaryLog::open(&path).unwrap();
        log.append("строка\nвторая\tтаб", "line\nsecond\ttab");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "строка\\nвторая\\tтаб\tline\\nsecond\\ttab");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_lines_whole() {
        const TASKS: usize = 32;
        let dir = TempDir::new().unwrap();
        let log = std::sync::Arc::new(GlossaryLog::open(dir.path().join("glossary.tsv")).unwrap());

        let handles: Vec<_> = (0..TASKS)
            .map(|i| {
                let log = std::sync::Arc::clone(&log);
                tokio::spawn(async move {
                    log.append(&format!("строка номер {i}"), &format!("line number {i}"));
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), TASKS + 1);
        assert_eq!(lines[0], "# original\ttranslation");
        for line in &lines[1..] {
            let (original, translation) = line.split_once('\t').unwrap();
            assert!(!translation.contains('\t'), "{line}");
            let n = original.strip_prefix("строка номер ").unwrap();
            assert_eq!(translation, format!("line number {n}"));
        }
    }
}
