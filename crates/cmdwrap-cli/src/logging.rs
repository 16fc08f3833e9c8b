// Logging setup

use tracing::Level;

/// Parse a level name, case-insensitively
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the stderr subscriber. Later calls are ignored.
pub fn init_logging(level: Level) {
    use tracing_subscriber::fmt;

    let debug = level >= Level::DEBUG;
    let _ = fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
