//! Input preparation and file discovery

use crate::error::{PipelineError, PipelineResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;
use walkdir::WalkDir;

/// The directory to translate, plus the scratch directory backing it when
/// the input was an archive. Dropping this removes the scratch directory.
#[derive(Debug)]
pub struct PreparedInput {
    root: PathBuf,
    _scratch: Option<TempDir>,
}

impl PreparedInput {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_extracted(&self) -> bool {
        self._scratch.is_some()
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Resolve `input` to a directory, extracting `.zip` archives first
pub fn prepare_input(input: &Path) -> PipelineResult<PreparedInput> {
    if input.is_dir() {
        return Ok(PreparedInput {
            root: input.to_path_buf(),
            _scratch: None,
        });
    }

    if input.is_file() && is_zip(input) {
        let scratch = TempDir::new().map_err(PipelineError::io(input))?;
        let file = File::open(input).map_err(PipelineError::io(input))?;
        let archive_error = |source| PipelineError::Archive {
            path: input.to_path_buf(),
            source,
        };
        let mut archive = zip::ZipArchive::new(file).map_err(archive_error)?;
        archive.extract(scratch.path()).map_err(archive_error)?;
        info!(
            "Extracted {} entries from {} to {}",
            archive.len(),
            input.display(),
            scratch.path().display()
        );

        return Ok(PreparedInput {
            root: scratch.path().to_path_buf(),
            _scratch: Some(scratch),
        });
    }

    Err(PipelineError::InvalidInput(format!(
        "{} is neither a directory nor a .zip archive",
        input.display()
    )))
}

/// Every regular file under `root`, as paths relative to `root`, sorted
///
/// Anything under `exclude` (the output root, when it lives inside the
/// input tree) is skipped.
pub fn discover_files(root: &Path, exclude: Option<&Path>) -> PipelineResult<Vec<PathBuf>> {
    let exclude = exclude.and_then(|path| path.canonicalize().ok());
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match &exclude {
            Some(excluded) => entry
                .path()
                .canonicalize()
                .map(|path| !path.starts_with(excluded))
                .unwrap_or(true),
            None => true,
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    Ok(files)
}
