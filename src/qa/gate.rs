//! Pre-run QA gate
//!
//! Before any project file is touched, a plain-text fixture and a source-file
//! fixture are translated with the run's backend and checked. The results are
//! written to `sanity_report.json`; a failing gate aborts the run.

use crate::config::QA_REPORT_FILE_NAME;
use crate::error::{PipelineError, PipelineResult};
use crate::mt::StringTranslator;
use crate::qa::checks::{IssueCode, QaResult, QaStatus, check_code, check_plain};
use crate::rewriter::SourceRewriter;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PLAIN_FIXTURE: &str = "sanity_check.txt";
const CODE_FIXTURE: &str = "sanity_check.java";

/// Texts the gate translates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaFixtures {
    pub plain: Option<String>,
    pub code: Option<String>,
}

impl QaFixtures {
    /// Fixtures compiled into the binary
    pub fn builtin() -> Self {
        Self {
            plain: Some(include_str!("../../fixtures/sanity_check.txt").to_string()),
            code: Some(include_str!("../../fixtures/sanity_check.java").to_string()),
        }
    }

    /// Load `sanity_check.txt` and `sanity_check.java` from `dir`; missing
    /// files skip their check
    pub fn from_dir(dir: &Path) -> PipelineResult<Self> {
        Ok(Self {
            plain: read_optional(&dir.join(PLAIN_FIXTURE))?,
            code: read_optional(&dir.join(CODE_FIXTURE))?,
        })
    }
}

fn read_optional(path: &Path) -> PipelineResult<Option<String>> {
    if !path.exists() {
        warn!("[SANITY] Missing {}, skipping its check", path.display());
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(PipelineError::io(path))
}

/// Results of all gate checks, by check name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateReport {
    pub results: BTreeMap<String, QaResult>,
}

impl GateReport {
    /// Names of checks that block the run; with `strict`, warnings block too
    pub fn blocking_checks(&self, strict: bool) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, result)| match result.status {
                QaStatus::Fail => true,
                QaStatus::Warn => strict,
                QaStatus::Ok => false,
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn passed(&self, strict: bool) -> bool {
        self.blocking_checks(strict).is_empty()
    }
}

/// Translate the fixtures with `translator` and check the results
///
/// `translator` should be a fork of the run translator so that fixture text
/// neither warms the run cache nor shows up in the run counters.
pub async fn run_gate(translator: &StringTranslator, fixtures: &QaFixtures) -> GateReport {
    let mut report = GateReport::default();

    if let Some(plain) = &fixtures.plain {
        info!("[SANITY] Plain-text check");
        let original = plain.trim();
        let result = match translator.translate_string(original).await {
            Ok(translated) => check_plain(original, &translated),
            Err(e) => {
                let mut result = check_plain(original, "");
                result
                    .details
                    .insert("backend_error".to_string(), json!(e.to_string()));
                result
            }
        };
        report.results.insert("plain_text".to_string(), result);
    }

    if let Some(code) = &fixtures.code {
        info!("[SANITY] Source-file check");
        let outcome = SourceRewriter::new(translator)
            .with_label(CODE_FIXTURE)
            .rewrite(code)
            .await;
        let mut result = check_code(code, &outcome.text);
        if outcome.failed_spans > 0 {
            result.push_warning(
                IssueCode::UntranslatedSpans,
                format!("{} spans kept their original text", outcome.failed_spans),
            );
        }
        report.results.insert("source_file".to_string(), result);
    }

    if report.results.is_empty() {
        warn!("[SANITY] No sanity checks were run (no fixtures)");
    }
    for (name, result) in &report.results {
        let codes: Vec<_> = result.issues.iter().map(|issue| issue.code).collect();
        info!(
            "[SANITY] {}: status={:?}, issues={:?}",
            name, result.status, codes
        );
    }

    report
}

/// Write the report as pretty JSON into `logs_dir`
pub fn write_report(report: &GateReport, logs_dir: &Path) -> PipelineResult<PathBuf> {
    std::fs::create_dir_all(logs_dir).map_err(PipelineError::io(logs_dir))?;
    let path = logs_dir.join(QA_REPORT_FILE_NAME);
    let json = serde_json::to_string_pretty(&report.results)?;
    std::fs::write(&path, json).map_err(PipelineError::io(&path))?;
    info!("[SANITY] Report written to {}", path.display());
    Ok(path)
}
