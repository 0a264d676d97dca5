//! Batch translation of a project tree
//!
//! [`run_project`] wires the pieces together: it prepares the input, builds
//! the backend and the run-scoped [`RunContext`], runs the QA gate and then
//! hands every file to the [`Dispatcher`].

pub mod context;
pub mod dispatcher;
pub mod input;
pub mod orchestrator;
pub mod output;
pub mod stats;

pub use context::{ProcessSettings, RunContext};
pub use dispatcher::{Dispatcher, RunSummary};
pub use orchestrator::{FileOutcome, process_file};
pub use stats::{Stats, StatsSummary};

use crate::config::{GLOSSARY_FILE_NAME, RunConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::mt::{GlossaryLog, StringTranslator};
use crate::qa::gate::{QaFixtures, run_gate, write_report};
use std::sync::Arc;
use tracing::{error, info};

/// Translate the project described by `config`
///
/// Fails before any file is processed when the configuration is invalid or
/// the QA gate rejects the backend; per-file errors only show up in the
/// returned summary.
pub async fn run_project(config: &RunConfig) -> PipelineResult<RunSummary> {
    config.validate()?;

    let logs_dir = config.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(PipelineError::io(&logs_dir))?;

    let prepared = input::prepare_input(&config.input)?;
    if prepared.is_extracted() {
        info!("Archive: {}", prepared.root().display());
    }
    let glossary_path = logs_dir.join(GLOSSARY_FILE_NAME);
    let glossary = GlossaryLog::open(&glossary_path).map_err(PipelineError::io(&glossary_path))?;
    info!("Glossary: {}", glossary.path().display());

    let backend = config.backend.build(&config.target_lang)?;
    let stats = Arc::new(Stats::new());
    let translator = StringTranslator::new(
        backend,
        config.source_lang.as_str(),
        config.target_lang.as_str(),
        Arc::clone(&stats),
    )
    .with_policy(config.policy)
    .with_glossary(Arc::new(glossary));
    info!("Backend: {}", translator.backend_name());
    info!(
        "Lang:    {} -> {}",
        config.source_lang, config.target_lang
    );
    info!("Policy:  {:?}", translator.policy());

    if config.skip_qa {
        info!("[SANITY] Skipped");
    } else {
        let fixtures = match &config.qa_fixtures {
            Some(dir) => QaFixtures::from_dir(dir)?,
            None => QaFixtures::builtin(),
        };
        let gate_translator = translator.fork(Arc::new(Stats::new()));
        let report = run_gate(&gate_translator, &fixtures).await;
        info!(
            "[SANITY] {} backend calls",
            gate_translator.stats().backend_calls()
        );
        write_report(&report, &logs_dir)?;

        let blocking = report.blocking_checks(config.strict_qa);
        if !blocking.is_empty() {
            let failed = blocking.join(", ");
            error!("[SANITY] Aborting: {} did not pass", failed);
            return Err(PipelineError::QaGateFailed(failed));
        }
    }

    let context = Arc::new(RunContext::new(translator, config.process_settings()));
    let summary = Dispatcher::new(context, config.workers)
        .run(prepared.root(), &config.output)
        .await?;

    summary.stats.log_summary(summary.wall_time);
    Ok(summary)
}
