//! Tracing subscriber setup for the binary.
//!
//! Library code only emits `tracing` events; embedders install their own subscriber.
//! Environment variables take precedence over the `[logging]` config section:
//!
//! - `BATCHSAVE_TRACE_LEVEL` - filter directive (`debug`, `batchsave=trace`, ...)
//! - `BATCHSAVE_TRACE_JSON` - `1` for JSON lines, `0` for compact text
//! - `BATCHSAVE_TRACE_FILE` - append to this file instead of stderr

use std::env;
use std::sync::OnceLock;

use crate::config::LoggingConfig;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init_tracing(logging_config: &LoggingConfig) {
    let json = env::var("BATCHSAVE_TRACE_JSON")
        .ok()
        .map_or_else(|| logging_config.format == "json", |v| v != "0");

    let level = env::var("BATCHSAVE_TRACE_LEVEL")
        .ok()
        .unwrap_or_else(|| logging_config.level.clone());

    let (non_blocking, guard) = match env::var("BATCHSAVE_TRACE_FILE") {
        Ok(log_path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(e) => {
                eprintln!("ERROR: Unable to open BATCHSAVE_TRACE_FILE '{log_path}': {e}");
                return;
            }
        },
        Err(_) => tracing_appender::non_blocking(std::io::stderr()),
    };
    let _ = TRACE_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking.clone())
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
