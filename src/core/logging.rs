//! Logging setup on top of flexi_logger
//!
//! Three output formats are supported: `text` (default), `ext` (with the
//! source location) and `json` (one compact object per line).

use flexi_logger::{DeferredNow, FileSpec, FormatFunction, Logger, LoggerHandle};
use std::io::Write;
use std::sync::{Mutex, OnceLock};

// dropping the handle would close file output
static LOGGER_HANDLE: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
    color_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut logger =
        Logger::try_with_str(log_level.unwrap_or("info"))?.format(formatter(log_format, color_enabled));

    logger = match log_file.filter(|path| *path != "none") {
        Some(path) => logger.log_to_file(FileSpec::try_from(std::path::Path::new(path))?),
        None => logger.log_to_stderr(),
    };

    let handle = logger.start()?;
    if LOGGER_HANDLE.set(Mutex::new(handle)).is_err() {
        log::debug!("Logger handle already stored; keeping the first one");
    }
    Ok(())
}

fn formatter(log_format: Option<&str>, color: bool) -> FormatFunction {
    match (log_format.unwrap_or("text"), color) {
        ("json", _) => json_line,
        ("ext", true) => |w, now, r| plain_line(w, now, r, true, true),
        ("ext", false) => |w, now, r| plain_line(w, now, r, true, false),
        (_, true) => |w, now, r| plain_line(w, now, r, false, true),
        (_, false) => |w, now, r| plain_line(w, now, r, false, false),
    }
}

fn level_abbr(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

// "2026-01-31 09:15:02.123 INF Cloned repository (repository/acquirer.rs:42)"
fn plain_line(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
    with_location: bool,
    color: bool,
) -> std::io::Result<()> {
    use colored::Colorize;

    let stamp = now.format(TIMESTAMP).to_string();
    let abbr = level_abbr(record.level());
    if color {
        let level = match record.level() {
            log::Level::Error => abbr.red().bold(),
            log::Level::Warn => abbr.yellow(),
            log::Level::Info => abbr.green(),
            log::Level::Debug => abbr.blue(),
            log::Level::Trace => abbr.magenta(),
        };
        write!(w, "{} {} {}", stamp.dimmed(), level, record.args())?;
    } else {
        write!(w, "{} {} {}", stamp, abbr, record.args())?;
    }

    if with_location {
        let location = source_location(record.target(), record.line());
        if color {
            write!(w, " ({})", location.dimmed())?;
        } else {
            write!(w, " ({})", location)?;
        }
    }
    Ok(())
}

fn json_line(w: &mut dyn Write, now: &mut DeferredNow, record: &log::Record) -> std::io::Result<()> {
    let line = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_abbr(record.level()),
        "message": record.args().to_string(),
        "target": source_location(record.target(), record.line()),
    });
    serde_json::to_writer(w, &line).map_err(std::io::Error::other)
}

// todoscan::scanner::engine -> scanner/engine.rs
fn source_location(target: &str, line: Option<u32>) -> String {
    let path = match target.strip_prefix("todoscan::") {
        Some(module) => format!("{}.rs", module.replace("::", "/")),
        None => target.replace("::", "/"),
    };
    match line {
        Some(line) => format!("{}:{}", path, line),
        None => path,
    }
}
