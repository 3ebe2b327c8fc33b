//! Session logger: the backend behind the `log` facade.
//!
//! Every record is written to one file in the OS data directory. The file is
//! **truncated at each launch**, so it only holds the most recent session.
//! Warnings and errors are mirrored to stderr.
//!
//! Log location:
//!   Windows:  `%APPDATA%\DeluxeDraw\deluxe-draw.log`
//!   Linux:    `~/.local/share/DeluxeDraw/deluxe-draw.log`
//!   macOS:    `~/Library/Application Support/DeluxeDraw/deluxe-draw.log`

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    level: LevelFilter,
}

impl SessionLogger {
    fn write_line(&self, line: &str) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), &record.args().to_string());
        self.write_line(&line);
        if record.level() <= Level::Warn {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// `[HH:MM:SS] [LEVEL] message`
pub fn format_line(level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", timestamp(), level, msg)
}

/// Install the session logger. Only the first call has any effect.
///
/// * Creates (or truncates) the log file; failing to open it is not fatal.
/// * Installs a panic hook that writes the panic message to the log before
///   running the previous hook.
pub fn init(level: LevelFilter) {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            Some(Mutex::new(f))
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    };

    let logger = SessionLogger { file, level };
    logger.write_line(&format!(
        "=== Deluxe Draw session started (unix {}) ===",
        unix_seconds().unwrap_or(0)
    ));
    logger.write_line(&format!("Log file: {}", path.display()));

    if log::set_boxed_logger(Box::new(logger)).is_err() {
        return;
    }
    log::set_max_level(level);

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC: {}", info);
        log::logger().flush();
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("DeluxeDraw").join("deluxe-draw.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn unix_seconds() -> Option<u64> {
    SystemTime::now().duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// HH:MM:SS within the current (UTC) day.
fn timestamp() -> String {
    match unix_seconds() {
        Some(secs) => {
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        None => "??:??:??".to_string(),
    }
}
