use chrono::Utc;
use env_logger::Env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Initialises the global logger
///
/// `RUST_LOG` overrides the default level, which is `debug` in debug mode
/// and `info` otherwise. Calling this twice is harmless.
pub fn init_logging(debug_mode: bool) {
    let default_level = if debug_mode { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

/// Logs a message to a file with timestamp
///
/// # Arguments
///
/// * `log_dir` - Directory holding the log files (created if missing)
/// * `filename` - The name of the log file
/// * `message` - The message to log
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_to_file(log_dir: &str, filename: &str, message: &str) -> io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let path = Path::new(log_dir).join(filename);

    // Open file in append mode, create if it doesn't exist
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    writeln!(file, "\n--- Log entry at {} ---", Utc::now().to_rfc3339())?;
    writeln!(file, "{}", message)?;
    writeln!(file, "--- End of entry ---\n")?;

    file.flush()?;

    Ok(())
}

/// Appends data to a CSV file, creating headers if the file is new
///
/// # Arguments
///
/// * `log_dir` - Directory holding the log files (created if missing)
/// * `filename` - The name of the CSV file
/// * `headers` - Column headers (only written if file is new)
/// * `data` - Row of data to append
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_csv(log_dir: &str, filename: &str, headers: &[&str], data: &[&str]) -> io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let path = Path::new(log_dir).join(filename);
    let file_exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::Writer::from_writer(file);

    if !file_exists && !headers.is_empty() {
        writer.write_record(headers)?;
    }

    writer.write_record(data)?;
    writer.flush()?;

    Ok(())
}
