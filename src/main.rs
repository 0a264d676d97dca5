use anyhow::{Context, bail};
use clap::{Arg, ArgAction, Command, value_parser};
use serde_json::{Map, Value};
use source_translate::config::{
    ApiKey, BackendConfig, DEFAULT_TIMEOUT_SECS, RunConfig,
};
use source_translate::logging::init_logging;
use source_translate::mt::{ChatCompletionProvider, GenerateProvider, QuoteStrip, TranslationPolicy};
use source_translate::{PipelineError, run_project};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn cli() -> Command {
    Command::new("source-translate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate comments and string literals of a source tree with a local LLM")
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .help("Project directory or .zip archive")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output directory (mirrors the input tree)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .short('b')
                .help("chat: OpenAI-compatible chat completions (llama.cpp), generate: Ollama /api/generate, mock: offline dry run")
                .value_parser(["chat", "generate", "mock"])
                .default_value("chat"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .help("Backend endpoint URL (default depends on --backend)"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .short('m')
                .help("Model name or server-side alias (required unless --backend mock)"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .env("LLM_API_KEY")
                .hide_env_values(true)
                .help("Bearer token for the chat backend"),
        )
        .arg(
            Arg::new("generate-options")
                .long("generate-options")
                .help("JSON object with extra model options for --backend generate, e.g. '{\"num_ctx\": 8192}'"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .short('w')
                .help("Number of files processed in parallel")
                .value_parser(value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            Arg::new("source-lang")
                .long("source-lang")
                .help("Source language code")
                .default_value("ru"),
        )
        .arg(
            Arg::new("target-lang")
                .long("target-lang")
                .help("Target language code")
                .default_value("en"),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .help("Extension of files to translate (repeatable)")
                .action(ArgAction::Append)
                .default_value("java"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Timeout of one backend call, in seconds")
                .value_parser(value_parser!(u64))
                .default_value("600"),
        )
        .arg(
            Arg::new("skip-qa")
                .long("skip-qa")
                .help("Do not run the QA gate before translating")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict-qa")
                .long("strict-qa")
                .help("Abort the run on QA warnings, not only failures")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("qa-fixtures")
                .long("qa-fixtures")
                .help("Directory with sanity_check.txt / sanity_check.java replacing the built-in fixtures")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-file-qa")
                .long("no-file-qa")
                .help("Do not check the structure of each translated file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("bare-words")
                .long("bare-words")
                .help("Also translate single-word strings such as \"Save\"")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quote-strip")
                .long("quote-strip")
                .help("When to remove quotes the model wrapped around its answer")
                .value_parser(["always", "unless-quoted", "never"])
                .default_value("unless-quoted"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn backend_config(matches: &clap::ArgMatches) -> anyhow::Result<BackendConfig> {
    let url = matches.get_one::<String>("url").cloned();
    let model = matches.get_one::<String>("model").cloned();
    let timeout_secs = *matches.get_one::<u64>("timeout").unwrap_or(&DEFAULT_TIMEOUT_SECS);

    let backend = matches
        .get_one::<String>("backend")
        .map(String::as_str)
        .unwrap_or("chat");
    if backend == "mock" {
        return Ok(BackendConfig::Mock);
    }

    let Some(model) = model else {
        bail!("--model is required for --backend {}", backend);
    };

    Ok(match backend {
        "generate" => {
            let options = match matches.get_one::<String>("generate-options") {
                Some(raw) => match serde_json::from_str::<Value>(raw)
                    .context("--generate-options is not valid JSON")?
                {
                    Value::Object(map) => map,
                    _ => bail!("--generate-options must be a JSON object"),
                },
                None => Map::new(),
            };
            BackendConfig::Generate {
                url: url.unwrap_or_else(|| GenerateProvider::DEFAULT_URL.to_string()),
                model,
                timeout_secs,
                options,
            }
        }
        _ => BackendConfig::ChatCompletion {
            url: url.unwrap_or_else(|| ChatCompletionProvider::DEFAULT_URL.to_string()),
            model,
            timeout_secs,
            api_key: matches
                .get_one::<String>("api-key")
                .filter(|key| !key.trim().is_empty())
                .map(ApiKey::new),
        },
    })
}

fn run_config(matches: &clap::ArgMatches) -> anyhow::Result<RunConfig> {
    let input = matches
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let output = matches
        .get_one::<PathBuf>("output")
        .context("--output is required")?;

    let mut config = RunConfig::new(input, output, backend_config(matches)?);
    if let Some(lang) = matches.get_one::<String>("source-lang") {
        config.source_lang = lang.clone();
    }
    if let Some(lang) = matches.get_one::<String>("target-lang") {
        config.target_lang = lang.clone();
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = *workers;
    }
    if let Some(extensions) = matches.get_many::<String>("ext") {
        config.extensions = extensions.cloned().collect();
    }
    config.skip_qa = matches.get_flag("skip-qa");
    config.strict_qa = matches.get_flag("strict-qa");
    config.qa_fixtures = matches.get_one::<PathBuf>("qa-fixtures").cloned();
    config.check_output = !matches.get_flag("no-file-qa");
    config.policy = TranslationPolicy {
        bare_words_visible: matches.get_flag("bare-words"),
        quote_strip: matches
            .get_one::<String>("quote-strip")
            .and_then(|value| QuoteStrip::parse(value))
            .unwrap_or_default(),
    };

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    let config = run_config(&matches)?;

    let log_path = init_logging(&config.logs_dir(), matches.get_flag("verbose"))
        .context("failed to initialize logging")?;

    info!("Input:   {}", config.input.display());
    info!("Output:  {}", config.output.display());
    info!("Workers: {}", config.workers);
    info!("Log:     {}", log_path.display());

    match run_project(&config).await {
        Ok(summary) => {
            if summary.stats.files_errored > 0 {
                info!(
                    "Finished with {} file errors; rerun to retry them",
                    summary.stats.files_errored
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::QaGateFailed(checks)) => {
            error!(
                "QA gate failed ({}); see {} for details",
                checks,
                config.logs_dir().display()
            );
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
