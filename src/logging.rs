use log::{LevelFilter, Record};

/// Timestamped logging to stdout. Pipe through `tee` for a log file:
/// `./rusty-chess-oracle 2>&1 | tee -a oracle.log`
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {}",
                prefix(record, &chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
                message
            ))
        })
        .level(level)
        // http internals are noisy at debug
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()
}

fn prefix(record: &Record, timestamp: &str) -> String {
    format!("[{timestamp} {:<5} {}]", record.level(), record.target())
}
