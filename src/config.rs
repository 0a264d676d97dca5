//! Run configuration and backend selection

use crate::error::{PipelineError, PipelineResult};
use crate::mt::{
    ChatCompletionProvider, GenerateProvider, MockMode, MockTranslator, MtResult,
    TranslationBackend, TranslationPolicy, validate_locale,
};
use crate::pipeline::context::ProcessSettings;
use crate::pipeline::output::DEFAULT_ATOMIC_THRESHOLD;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Reserved subdirectory of the output root for run artifacts
pub const LOG_DIR_NAME: &str = "_translation_logs";
pub const LOG_FILE_NAME: &str = "translation.log";
pub const GLOSSARY_FILE_NAME: &str = "glossary_suggestions.tsv";
pub const QA_REPORT_FILE_NAME: &str = "sanity_report.json";

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_SOURCE_LANG: &str = "ru";
pub const DEFAULT_TARGET_LANG: &str = "en";

/// Bearer token that never shows up in logs
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// OpenAI-compatible `/v1/chat/completions` (llama.cpp server)
    ChatCompletion {
        url: String,
        model: String,
        timeout_secs: u64,
        api_key: Option<ApiKey>,
    },
    /// Ollama-style `/api/generate`
    Generate {
        url: String,
        model: String,
        timeout_secs: u64,
        options: Map<String, Value>,
    },
    /// Offline dry run: every translation gets a ` [<target>]` suffix
    Mock,
}

impl BackendConfig {
    /// Instantiate the configured backend
    pub fn build(&self, target_lang: &str) -> MtResult<Arc<dyn TranslationBackend>> {
        let backend: Arc<dyn TranslationBackend> = match self {
            BackendConfig::ChatCompletion {
                url,
                model,
                timeout_secs,
                api_key,
            } => {
                let provider = ChatCompletionProvider::new(
                    url.as_str(),
                    model.as_str(),
                    Duration::from_secs(*timeout_secs),
                )?;
                match api_key {
                    Some(key) => Arc::new(provider.with_api_key(key.expose())),
                    None => Arc::new(provider),
                }
            }
            BackendConfig::Generate {
                url,
                model,
                timeout_secs,
                options,
            } => Arc::new(
                GenerateProvider::new(url.as_str(), model.as_str(), Duration::from_secs(*timeout_secs))?
                    .with_options(options.clone()),
            ),
            BackendConfig::Mock => Arc::new(MockTranslator::new(MockMode::Suffix(format!(
                " [{}]",
                target_lang
            )))),
        };
        Ok(backend)
    }
}

/// Everything one run needs
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Project directory or `.zip` archive
    pub input: PathBuf,
    pub output: PathBuf,
    pub backend: BackendConfig,
    pub source_lang: String,
    pub target_lang: String,
    pub workers: usize,
    /// Extensions (without dot) of files whose comments and strings are translated
    pub extensions: Vec<String>,
    pub atomic_write_threshold: usize,
    pub skip_qa: bool,
    /// Treat QA warnings as gate failures
    pub strict_qa: bool,
    /// Directory overriding the built-in QA fixtures
    pub qa_fixtures: Option<PathBuf>,
    /// Check the structure of every rewritten file, logging warnings
    pub check_output: bool,
    pub policy: TranslationPolicy,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, backend: BackendConfig) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            backend,
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            workers: DEFAULT_WORKERS,
            extensions: vec!["java".to_string()],
            atomic_write_threshold: DEFAULT_ATOMIC_THRESHOLD,
            skip_qa: false,
            strict_qa: false,
            qa_fixtures: None,
            check_output: true,
            policy: TranslationPolicy::default(),
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.output.join(LOG_DIR_NAME)
    }

    pub fn process_settings(&self) -> ProcessSettings {
        ProcessSettings {
            translatable_extensions: self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            atomic_write_threshold: self.atomic_write_threshold,
            check_output: self.check_output,
        }
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> PipelineResult<()> {
        validate_locale(&self.source_lang)?;
        validate_locale(&self.target_lang)?;

        if self.workers == 0 {
            return Err(PipelineError::InvalidInput(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one translatable extension is required".to_string(),
            ));
        }
        if !self.input.exists() {
            return Err(PipelineError::InvalidInput(format!(
                "input path does not exist: {}",
                self.input.display()
            )));
        }
        if self.input == self.output {
            return Err(PipelineError::InvalidInput(
                "output must differ from input".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chat_backend() -> BackendConfig {
        BackendConfig::ChatCompletion {
            url: ChatCompletionProvider::DEFAULT_URL.to_string(),
            model: "gemma-3-4b-it".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: Some(ApiKey::new("secret-token")),
        }
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("in", "out", BackendConfig::Mock);
        assert_eq!(config.source_lang, "ru");
        assert_eq!(config.target_lang, "en");
        assert_eq!(config.workers, 4);
        assert_eq!(config.logs_dir(), PathBuf::from("out").join("_translation_logs"));
        assert_eq!(
            config.process_settings().atomic_write_threshold,
            DEFAULT_ATOMIC_THRESHOLD
        );
    }

    #[test]
    fn test_extensions_are_normalized() {
        let mut config = RunConfig::new("in", "out", BackendConfig::Mock);
        config.extensions = vec![".JAVA".to_string(), "kt".to_string()];
        assert_eq!(
            config.process_settings().translatable_extensions,
            vec!["java".to_string(), "kt".to_string()]
        );
    }

    #[test]
    fn test_validate() {
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(dir.path(), dir.path().join("out"), BackendConfig::Mock);
        assert!(config.validate().is_ok());

        config.target_lang = "en@x".to_string();
        assert!(matches!(config.validate(), Err(PipelineError::Backend(_))));

        config.target_lang = "en".to_string();
        config.workers = 0;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidInput(_))));

        config.workers = 2;
        config.input = dir.path().join("missing");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_hidden() {
        let config = RunConfig::new("in", "out", chat_backend());
        let debug = format!("{:?}", config);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!debug.contains("secret-token"));
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"kind\":\"chat_completion\""));
    }

    #[tokio::test]
    async fn test_build_backends() {
        assert_eq!(chat_backend().build("en").unwrap().provider_name(), "Chat Completion");

        let generate = BackendConfig::Generate {
            url: GenerateProvider::DEFAULT_URL.to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout_secs: 30,
            options: Map::new(),
        };
        assert_eq!(generate.build("en").unwrap().provider_name(), "Generate");

        let mock = BackendConfig::Mock.build("en").unwrap();
        let reply = mock.translate("s", "Translate\n\nпривет").await.unwrap();
        assert_eq!(reply.text, "привет [en]");
    }

    #[test]
    fn test_empty_model_is_a_config_error() {
        let config = BackendConfig::ChatCompletion {
            url: ChatCompletionProvider::DEFAULT_URL.to_string(),
            model: String::new(),
            timeout_secs: 10,
            api_key: None,
        };
        assert!(config.build("en").is_err());
    }
}
