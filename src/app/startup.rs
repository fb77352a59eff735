//! Application startup
//!
//! Parses the command line, loads configuration, installs logging and signal
//! handling, then drives one scan session and renders its events.

use super::cli::args::Args;
use super::cli::config::{load_settings, CliError};
use super::output::{sink_for, write_repository_list};
use crate::core::error_handling::ErrorReporter;
use crate::core::logging::init_logging;
use crate::core::settings::Settings;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::styles::clap_styles;
use crate::events::emitter::EventEmitter;
use crate::events::event::ScanEvent;
use crate::patterns::PatternSet;
use crate::repository::acquirer::RepositoryAcquirer;
use crate::repository::store::RepositoryStore;
use crate::repository::transport::GitTransport;
use crate::repository::types::AcquireMode;
use crate::scanner::engine::ScanEngine;
use clap::{CommandFactory, FromArgMatches};
use std::ffi::OsString;
use std::io::IsTerminal;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_SCAN_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Run the binary and return its exit code
pub fn run() -> i32 {
    let raw: Vec<OsString> = std::env::args_os().collect();
    let styled = std::io::stdout().is_terminal() && !raw.iter().any(|a| a == "--no-color");

    let matches = Args::command().styles(clap_styles(styled)).get_matches_from(&raw);
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let use_color = args.use_color(std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    if let Err(e) = init_logging(
        settings.log_level.as_deref(),
        settings.log_format.as_deref(),
        settings.log_file.as_deref(),
        use_color && settings.log_file.as_deref().map_or(true, |f| f == "none"),
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return EXIT_USAGE;
    }
    log::debug!("Settings: {:?}", settings);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("{}", CliError::Runtime(e));
            return EXIT_SCAN_FAILED;
        }
    };

    runtime.block_on(execute(args, settings, use_color))
}

async fn execute(args: Args, settings: Settings, color: bool) -> i32 {
    let store = match RepositoryStore::open(&settings.repos_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Cannot open repository store: {}", e);
            eprintln!("Error: {}", e.display_message());
            return EXIT_SCAN_FAILED;
        }
    };

    let mut stdout = std::io::stdout().lock();

    if args.list {
        let listed = store
            .list()
            .map_err(|e| e.to_string())
            .and_then(|refs| {
                write_repository_list(&mut stdout, &refs, args.format, color).map_err(|e| e.to_string())
            });
        return match listed {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_SCAN_FAILED
            }
        };
    }

    let Some(repository) = args.repository.clone() else {
        eprintln!("Error: no repository given");
        return EXIT_USAGE;
    };

    let patterns = match PatternSet::from_settings(&settings.patterns) {
        Ok(patterns) => patterns,
        Err(e) => {
            eprintln!("Error: {}", CliError::Patterns(e.to_string()));
            return EXIT_USAGE;
        }
    };

    let acquirer = RepositoryAcquirer::new(store, Arc::new(GitTransport::new()))
        .with_retry_policy(settings.retry.policy())
        .with_busy_policy(settings.on_busy);
    let engine = ScanEngine::new(patterns, settings.scan.clone());
    let reporter = Arc::new(ErrorReporter::new());
    let emitter = EventEmitter::new(acquirer, engine).with_reporter(Arc::clone(&reporter));

    let (coordinator, mut shutdown) = ShutdownCoordinator::new();
    coordinator.install_signal_handlers();

    let mode = if args.no_pull {
        AcquireMode::Cached
    } else {
        AcquireMode::Sync
    };
    log::info!("Scanning {} ({:?})", repository, mode);

    let mut sink = sink_for(args.format, &mut stdout, color);
    let mut stream = emitter.start(repository, mode);
    let mut outcome: Option<ScanEvent> = None;
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = stream.next_event() => {
                let Some(event) = event else { break };
                if let Err(e) = sink.event(&event) {
                    log::warn!("Output closed: {}", e);
                    interrupted = true;
                    break;
                }
                if event.is_terminal() {
                    outcome = Some(event);
                }
            }
            _ = shutdown.recv() => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        stream.cancel().await;
        let _ = sink.finish();
        return EXIT_INTERRUPTED;
    }

    if let Err(e) = sink.finish() {
        log::warn!("Could not write output: {}", e);
    }

    let stats = reporter.stats();
    if !stats.is_empty() {
        log::debug!("Error statistics: {:?}", stats);
    }

    match outcome {
        Some(ScanEvent::Complete { .. }) => EXIT_SUCCESS,
        _ => EXIT_SCAN_FAILED,
    }
}
