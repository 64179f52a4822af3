use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing::Span;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Keeps the file writer flushing for the lifetime of a run.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Span every synthesis event is recorded under, so one run's JSON lines can be
    /// grouped by `run_id`.
    pub fn run_span(&self, topic: &str) -> Span {
        tracing::info_span!(target: "flipflop", "synthesis_run", run_id = %self.run_id, topic = %topic)
    }
}

/// Where rolled log files live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogLayout {
    dir: PathBuf,
    file_prefix: String,
}

impl LogLayout {
    fn resolve(config: &LoggingConfig, working_dir: &Path) -> Result<Self> {
        if config.dir.as_os_str().is_empty() {
            return Err(anyhow!("logging.dir cannot be empty"));
        }
        if config.file_prefix.trim().is_empty() {
            return Err(anyhow!("logging.file_prefix cannot be empty"));
        }

        let dir = if config.dir.is_absolute() {
            config.dir.clone()
        } else {
            working_dir.join(&config.dir)
        };
        Ok(Self {
            dir,
            file_prefix: config.file_prefix.clone(),
        })
    }

    fn owns(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.file_prefix)
    }
}

/// Deletes this crate's rolled files older than the retention window. Problems are
/// collected as warnings and logged once the subscriber is up.
struct RetentionSweep<'a> {
    layout: &'a LogLayout,
    max_age: Duration,
}

impl RetentionSweep<'_> {
    fn run(&self, now: SystemTime) -> Vec<String> {
        let cutoff = now.checked_sub(self.max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut warnings = Vec::new();

        let entries = match fs::read_dir(&self.layout.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warnings.push(format!(
                    "cannot scan {} for expired logs: {}",
                    self.layout.dir.display(),
                    err
                ));
                return warnings;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warnings.push(format!("cannot read log directory entry: {}", err));
                    continue;
                }
            };
            if !self.layout.owns(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let path = entry.path();
            match expired_file(&entry, cutoff) {
                Ok(false) => {}
                Ok(true) => {
                    if let Err(err) = fs::remove_file(&path) {
                        warnings.push(format!("cannot remove {}: {}", path.display(), err));
                    }
                }
                Err(err) => warnings.push(format!("cannot inspect {}: {}", path.display(), err)),
            }
        }

        warnings
    }
}

fn expired_file(entry: &fs::DirEntry, cutoff: SystemTime) -> std::io::Result<bool> {
    let metadata = entry.metadata()?;
    if !metadata.is_file() {
        return Ok(false);
    }
    Ok(metadata.modified()? <= cutoff)
}

/// JSON lines into `{dir}/{file_prefix}.<date>` plus WARN and above on stderr, where
/// low-similarity and retry warnings show up while a run is in progress.
pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = file_filter(&config.filter)?;
    let working_dir = std::env::current_dir()
        .context("failed to read working directory to resolve logging.dir")?;
    let layout = LogLayout::resolve(config, &working_dir)?;
    fs::create_dir_all(&layout.dir)
        .with_context(|| format!("failed to create log directory {}", layout.dir.display()))?;

    let sweep_warnings = RetentionSweep {
        layout: &layout,
        max_age: Duration::from_secs((config.retention_days as u64).saturating_mul(SECONDS_PER_DAY)),
    }
    .run(SystemTime::now());

    let appender = match config.rotation {
        LoggingRotation::Daily => rolling::daily(&layout.dir, &layout.file_prefix),
        LoggingRotation::Hourly => rolling::hourly(&layout.dir, &layout.file_prefix),
    };
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %layout.dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        "logging_initialized"
    );
    for warning in sweep_warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_retention_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
        log_dir: layout.dir,
    })
}

fn file_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(filter).with_context(|| format!("invalid logging.filter '{filter}'"))
}
