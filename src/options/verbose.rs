use chrono::{Local, SecondsFormat};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> colored::ColoredString {
        match self {
            Level::Debug => "[DEBUG]".dimmed(),
            Level::Info => "[INFO]".blue(),
            Level::Warn => "[WARN]".yellow(),
            Level::Error => "[ERROR]".red(),
        }
    }
}

fn emit(level: Level, message: &str) {
    let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    match level {
        Level::Debug | Level::Info if is_verbose() => {
            println!("{} {}: {}", timestamp, level.tag(), message)
        }
        Level::Debug | Level::Info => {}
        Level::Warn | Level::Error => {
            eprintln!("{} {}: {}", timestamp, level.tag(), message)
        }
    }
}

pub fn debug(message: &str) {
    emit(Level::Debug, message);
}

pub fn info(message: &str) {
    emit(Level::Info, message);
}

pub fn warn(message: &str) {
    emit(Level::Warn, message);
}

pub fn error(message: &str) {
    emit(Level::Error, message);
}
