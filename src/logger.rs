/* Logger initialization */
use std::{panic, thread};

use tracing::{error, info, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{AppConfig, CargoEnv};

// connection pool and tls chatter from the upstream client, one line per segment otherwise
const QUIET_TARGETS: [&str; 4] = ["hyper_util", "reqwest", "rustls", "h2"];

pub struct LoggerGuards {
    pub _tracing_guard: WorkerGuard,
    pub _sentry_guard: Option<sentry::ClientInitGuard>,
}

pub struct Logger;

impl Logger {
    pub fn init(config: &AppConfig) -> LoggerGuards {
        let max_level = match config.cargo_env {
            CargoEnv::Development => LevelFilter::DEBUG,
            CargoEnv::Production => LevelFilter::INFO,
        };

        let filter = QUIET_TARGETS
            .iter()
            .fold(Targets::new().with_default(max_level), |targets, target| {
                targets.with_target(*target, LevelFilter::WARN)
            });

        let (non_blocking, guard) = match config.cargo_env {
            CargoEnv::Development => tracing_appender::non_blocking(std::io::stdout()),
            CargoEnv::Production => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "daily.log"))
            }
        };

        let sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    environment: Some(config.cargo_env.as_str().into()),
                    attach_stacktrace: true,
                    ..Default::default()
                },
            ))
        });

        // no color codes in the rolling file
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(config.cargo_env == CargoEnv::Development);

        let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
        if sentry_guard.is_some() {
            registry.with(sentry_tracing::layer()).init();
        } else {
            registry.init();
        }

        Self::install_panic_hook();

        info!(
            "logging at {} for {} (sentry {})",
            max_level,
            config.cargo_env.as_str(),
            if sentry_guard.is_some() { "on" } else { "off" }
        );

        LoggerGuards {
            _tracing_guard: guard,
            _sentry_guard: sentry_guard,
        }
    }

    /// panics inside a relay task would otherwise only reach stderr, which production never reads
    fn install_panic_hook() {
        panic::set_hook(Box::new(|info| {
            let thread = thread::current();
            let thread = thread.name().unwrap_or("unknown");

            let msg = info
                .payload()
                .downcast_ref::<&'static str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("Box<Any>");

            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown location".to_string());

            error!(
                target: "panic",
                "thread '{}' panicked at '{}': {}\n{:?}",
                thread,
                msg,
                location,
                backtrace::Backtrace::new()
            );
        }));
    }
}
