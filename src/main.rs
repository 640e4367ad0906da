// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use tokio_util::sync::CancellationToken;

use polysub::database::models::{MediaKind, RequestStatus, TranslationRequest};
use polysub::database::{DatabaseConnection, Repository};
use polysub::file_utils::FileManager;
use polysub::progress::{ProgressReporter, SqliteStatisticsRecorder};
use polysub::providers::{DefaultServiceFactory, ServiceFactory};
use polysub::settings::keys;
use polysub::translation::TranslationJob;

/// CLI wrapper for MediaKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliMediaKind {
    Movie,
    Episode,
}

impl From<CliMediaKind> for MediaKind {
    fn from(kind: CliMediaKind) -> Self {
        match kind {
            CliMediaKind::Movie => MediaKind::Movie,
            CliMediaKind::Episode => MediaKind::Episode,
        }
    }
}

/// CLI wrapper for log levels to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enqueue one subtitle file and translate it immediately
    Translate {
        /// Subtitle file to translate (SRT)
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Source language code (e.g., 'en')
        #[arg(short, long)]
        source_language: String,

        /// Target language code (e.g., 'es')
        #[arg(short, long)]
        target_language: String,

        /// Translation service to use (overrides the stored setting)
        #[arg(long)]
        service: Option<String>,

        /// Display title for the request (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,

        /// Kind of media the subtitle belongs to
        #[arg(long, value_enum, default_value = "movie")]
        media_kind: CliMediaKind,

        /// Database file path (defaults to the user data directory)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Enqueue every subtitle file found under a directory
    Scan {
        /// Directory to scan for SRT files
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// Source language code
        #[arg(short, long)]
        source_language: String,

        /// Target language code
        #[arg(short, long)]
        target_language: String,

        /// Database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Process all pending translation requests
    RunPending {
        /// Number of requests processed concurrently
        #[arg(short, long, default_value_t = 2)]
        concurrency: usize,

        /// Database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// List the languages a translation service supports
    Languages {
        /// Service name (defaults to the stored service_type setting)
        #[arg(long)]
        service: Option<String>,

        /// Database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Store one setting key/value pair
    SetSetting {
        /// Setting key, e.g. 'service_type' or 'openai_api_key'
        key: String,

        /// Setting value
        value: String,

        /// Database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Generate shell completions for polysub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// polysub - AI subtitle translation for media libraries
#[derive(Parser, Debug)]
#[command(name = "polysub")]
#[command(version = "0.3.0")]
#[command(about = "AI-powered subtitle translation pipeline")]
#[command(long_about = "polysub translates subtitle files using pluggable AI backends, \
tracking each translation as a persisted request that survives restarts.

EXAMPLES:
    polysub set-setting service_type openai
    polysub set-setting openai_api_key sk-...
    polysub translate -s en -t es movie.srt
    polysub scan -s en -t fr /media/shows/
    polysub run-pending --concurrency 4
    polysub languages --service ollama

SUPPORTED SERVICES:
    openai    - OpenAI API (requires openai_api_key)
    lmstudio  - LM Studio local server (OpenAI-compatible)
    ollama    - Local Ollama server
    mock      - Deterministic echo backend for testing")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Progress reporter driving an indicatif bar
struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for BarProgressReporter {
    fn report(&self, _request_id: &str, processed: usize, total: usize) {
        if self.bar.length().unwrap_or(0) != total as u64 {
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(processed as u64);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    let level = cli.log_level.map(Into::into).unwrap_or(LevelFilter::Info);
    CustomLogger::init(level)?;

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "polysub", &mut std::io::stdout());
            Ok(())
        }
        Commands::SetSetting { key, value, db_path } => {
            let repository = open_repository(db_path)?;
            repository.set_setting(&key, &value).await?;
            info!("Stored setting {}", key);
            Ok(())
        }
        Commands::Translate {
            input_path,
            source_language,
            target_language,
            service,
            title,
            media_kind,
            db_path,
        } => {
            run_translate(
                input_path,
                source_language,
                target_language,
                service,
                title,
                media_kind.into(),
                db_path,
            )
            .await
        }
        Commands::Scan {
            directory,
            source_language,
            target_language,
            db_path,
        } => run_scan(directory, source_language, target_language, db_path).await,
        Commands::RunPending { concurrency, db_path } => {
            run_pending(concurrency.max(1), db_path).await
        }
        Commands::Languages { service, db_path } => run_languages(service, db_path).await,
    }
}

/// Open the repository at the given or default database location
fn open_repository(db_path: Option<PathBuf>) -> Result<Repository> {
    let db = match db_path {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    Ok(Repository::new(db))
}

/// Build the orchestrator around a repository and a progress reporter
fn build_job(repository: &Repository, progress: Arc<dyn ProgressReporter>) -> TranslationJob {
    TranslationJob::new(
        Arc::new(repository.clone()),
        repository.clone(),
        Arc::new(DefaultServiceFactory),
        progress,
        Arc::new(SqliteStatisticsRecorder::new(repository.clone())),
    )
}

/// Cancellation token wired to Ctrl-C
fn cancellation_token() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current unit");
            handle.cancel();
        }
    });
    token
}

async fn run_translate(
    input_path: PathBuf,
    source_language: String,
    target_language: String,
    service: Option<String>,
    title: Option<String>,
    media_kind: MediaKind,
    db_path: Option<PathBuf>,
) -> Result<()> {
    if !FileManager::file_exists(&input_path) {
        return Err(anyhow!("Input file does not exist: {:?}", input_path));
    }

    let repository = open_repository(db_path)?;
    if let Some(service) = service {
        repository.set_setting(keys::SERVICE_TYPE, &service).await?;
    }

    let title = title.unwrap_or_else(|| {
        input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let source_hash = FileManager::hash_file(&input_path)?;
    let request = TranslationRequest::new(
        &title,
        media_kind,
        &input_path,
        &source_hash,
        &source_language,
        &target_language,
    );
    repository.create_translation_request(&request).await?;

    let reporter = Arc::new(BarProgressReporter::new());
    let job = build_job(&repository, reporter.clone());

    let result = job.execute(request, cancellation_token()).await?;
    reporter.finish();

    match result.status {
        RequestStatus::Completed => {
            info!(
                "Done: {}",
                result.translated_path.as_deref().unwrap_or("<unknown path>")
            );
            Ok(())
        }
        _ => Err(anyhow!(
            "Translation failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        )),
    }
}

async fn run_scan(
    directory: PathBuf,
    source_language: String,
    target_language: String,
    db_path: Option<PathBuf>,
) -> Result<()> {
    let repository = open_repository(db_path)?;

    let files = FileManager::find_files(&directory, "srt")
        .with_context(|| format!("Failed to scan {:?}", directory))?;

    let mut enqueued = 0;
    for file in files {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        // Skip files that already carry a language suffix, and sources
        // whose translated sibling is already on disk
        if stem.ends_with(&format!(".{}", target_language)) {
            continue;
        }
        if FileManager::translated_sibling_path(&file, &target_language).exists() {
            continue;
        }

        let source_hash = FileManager::hash_file(&file)?;
        let request = TranslationRequest::new(
            &stem,
            MediaKind::Movie,
            &file,
            &source_hash,
            &source_language,
            &target_language,
        );
        repository.create_translation_request(&request).await?;
        enqueued += 1;
    }

    info!("Enqueued {} translation request(s)", enqueued);
    Ok(())
}

async fn run_pending(concurrency: usize, db_path: Option<PathBuf>) -> Result<()> {
    let repository = open_repository(db_path)?;
    let pending = repository
        .list_requests_by_status(RequestStatus::Pending)
        .await?;

    if pending.is_empty() {
        info!("No pending translation requests");
        return Ok(());
    }

    info!(
        "Processing {} pending request(s), {} at a time",
        pending.len(),
        concurrency
    );

    let job = build_job(
        &repository,
        Arc::new(polysub::progress::LogProgressReporter),
    );
    let token = cancellation_token();

    let results: Vec<_> = futures::stream::iter(pending)
        .map(|request| {
            let job = &job;
            let token = token.child_token();
            async move { job.execute(request, token).await }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut completed = 0;
    let mut failed = 0;
    for result in results {
        match result {
            Ok(request) if request.status == RequestStatus::Completed => completed += 1,
            Ok(request) => {
                failed += 1;
                error!(
                    "Request {} failed: {}",
                    request.short_id(),
                    request.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            Err(e) => {
                failed += 1;
                error!("Request execution error: {}", e);
            }
        }
    }

    info!("Finished: {} completed, {} failed", completed, failed);
    if failed > 0 {
        return Err(anyhow!("{} request(s) failed", failed));
    }
    Ok(())
}

async fn run_languages(service: Option<String>, db_path: Option<PathBuf>) -> Result<()> {
    let repository = open_repository(db_path)?;

    let key_strings = keys::job_execution_keys();
    let key_refs: Vec<&str> = key_strings.iter().map(String::as_str).collect();
    let settings = repository.get_settings_map(&key_refs).await?;

    let service_type = service
        .or_else(|| settings.get(keys::SERVICE_TYPE).cloned())
        .ok_or_else(|| anyhow!("No service given and no service_type setting stored"))?;

    let factory = DefaultServiceFactory;
    let backend = factory
        .create_translation_service(&service_type, &settings)
        .map_err(|e| anyhow!("{}", e))?;

    let languages = backend
        .languages()
        .await
        .map_err(|e| anyhow!("Failed to list languages: {}", e))?;

    println!("Languages supported by {}:", service_type);
    for language in languages {
        println!("  {:4} {} ({} targets)", language.code, language.name, language.targets.len());
    }

    Ok(())
}
