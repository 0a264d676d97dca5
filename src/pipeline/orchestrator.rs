//! Per-file processing: resume, rewrite or copy, error containment

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::context::RunContext;
use crate::pipeline::output;
use crate::qa::{QaStatus, check_code};
use crate::rewriter::SourceRewriter;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Translated,
    Copied,
    /// The destination already existed; the source was not read
    SkippedResume,
    Error(String),
}

/// Process `source` into `dest`
///
/// Never fails: any error is counted, recorded in the run stats and
/// returned as [`FileOutcome::Error`].
pub async fn process_file(ctx: &RunContext, source: &Path, dest: &Path) -> FileOutcome {
    ctx.stats.record_file_seen();

    match try_process(ctx, source, dest).await {
        Ok(outcome) => {
            match outcome {
                FileOutcome::Translated => ctx.stats.record_translated(),
                FileOutcome::Copied => ctx.stats.record_copied(),
                FileOutcome::SkippedResume => ctx.stats.record_resumed(),
                FileOutcome::Error(_) => {}
            }
            outcome
        }
        Err(e) => {
            let message = format!("{}: {}", source.display(), e);
            error!("Failed to process {}", message);
            ctx.stats.record_error(message.clone());
            FileOutcome::Error(message)
        }
    }
}

async fn try_process(ctx: &RunContext, source: &Path, dest: &Path) -> PipelineResult<FileOutcome> {
    if tokio::fs::try_exists(dest)
        .await
        .map_err(PipelineError::io(dest))?
    {
        debug!("Resume: {} already exists", dest.display());
        return Ok(FileOutcome::SkippedResume);
    }

    if !ctx.settings.is_translatable(source) {
        let (from, to) = (source.to_path_buf(), dest.to_path_buf());
        let threshold = ctx.settings.atomic_write_threshold;
        run_blocking(move || output::copy_preserving(&from, &to, threshold)).await?;
        debug!("Copied {}", source.display());
        return Ok(FileOutcome::Copied);
    }

    let bytes = tokio::fs::read(source)
        .await
        .map_err(PipelineError::io(source))?;
    let text = String::from_utf8(bytes).map_err(|e| PipelineError::Io {
        path: source.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let outcome = SourceRewriter::new(&ctx.translator)
        .with_label(source.display().to_string())
        .rewrite(&text)
        .await;

    info!(
        "Translated {} ({} spans, {} kept original)",
        source.display(),
        outcome.translated_spans,
        outcome.failed_spans
    );

    if ctx.settings.check_output && outcome.translated_spans > 0 {
        let qa = check_code(&text, &outcome.text);
        if qa.status != QaStatus::Ok {
            let codes: Vec<_> = qa.issues.iter().map(|issue| issue.code).collect();
            warn!(
                "[QA] {}: status={:?}, issues={:?}",
                source.display(),
                qa.status,
                codes
            );
        }
    }

    let dest_owned: PathBuf = dest.to_path_buf();
    let threshold = ctx.settings.atomic_write_threshold;
    run_blocking(move || output::write_output(&dest_owned, outcome.text.as_bytes(), threshold))
        .await?;
    Ok(FileOutcome::Translated)
}

/// Run blocking filesystem work off the async worker threads
async fn run_blocking<F>(work: F) -> PipelineResult<()>
where
    F: FnOnce() -> PipelineResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
