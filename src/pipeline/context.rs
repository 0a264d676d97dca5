//! Run-scoped state handed to every worker
//!
//! One [`RunContext`] exists per run. It owns the translator (and through it
//! the cache and glossary log) and the counters; nothing here is global.

use crate::mt::StringTranslator;
use crate::pipeline::output::DEFAULT_ATOMIC_THRESHOLD;
use crate::pipeline::stats::Stats;
use std::path::Path;
use std::sync::Arc;

/// How individual files are handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    /// Lower-case extensions (without dot) of files that are rewritten
    pub translatable_extensions: Vec<String>,
    pub atomic_write_threshold: usize,
    /// Run the structural QA check on every rewritten file and log problems
    pub check_output: bool,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            translatable_extensions: vec!["java".to_string()],
            atomic_write_threshold: DEFAULT_ATOMIC_THRESHOLD,
            check_output: true,
        }
    }
}

impl ProcessSettings {
    pub fn is_translatable(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.translatable_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

#[derive(Debug)]
pub struct RunContext {
    pub translator: StringTranslator,
    pub stats: Arc<Stats>,
    pub settings: ProcessSettings,
}

impl RunContext {
    /// The translator must record into `stats`
    pub fn new(translator: StringTranslator, settings: ProcessSettings) -> Self {
        let stats = Arc::clone(translator.stats());
        Self {
            translator,
            stats,
            settings,
        }
    }
}
