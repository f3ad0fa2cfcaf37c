use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::fs::{OpenOptions, create_dir_all};
use std::path::Path;
use colored::Colorize;

/// Initializes the global logger from the application config.
///
/// Logs always go to the configured log file; stdout is chained in only
/// when `LOG_TO_STDOUT` is set. Must be called once, before any log macro.
pub fn init_logger() {
    init_logger_with(
        &crate::config::log_level(),
        &crate::config::log_file(),
        crate::config::log_to_stdout(),
    );
}

pub fn init_logger_with(log_level: &str, log_file_path: &str, log_to_stdout: bool) {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.exists() {
            create_dir_all(parent).expect("Failed to create log directory");
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .expect("Cannot open log file");

    let level = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    let mut dispatch = Dispatch::new()
        .format(|out, message, record| {
            let level_str = match record.level() {
                log::Level::Error => "ERROR".red(),
                log::Level::Warn => "WARN".yellow(),
                log::Level::Info => "INFO".green(),
                log::Level::Debug => "DEBUG".cyan(),
                log::Level::Trace => "TRACE".normal(),
            };

            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level_str,
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(log_file);

    if log_to_stdout {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch.apply().expect("Failed to initialize logger");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_writes_to_file() {
        let path = std::env::temp_dir().join(format!(
            "scolarus-logger-test-{}.log",
            std::process::id()
        ));
        init_logger_with("info", path.to_str().unwrap(), false);

        log::info!("logger smoke line");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("logger smoke line"));
        let _ = std::fs::remove_file(&path);
    }
}
