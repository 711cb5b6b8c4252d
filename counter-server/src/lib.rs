// Counter Server Library

pub mod dispatch;
pub mod load;
pub mod server;

use tracing::Level;

/// Log level for a `-v` count and `-q` flag. The default is `INFO`.
pub fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::WARN;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the fmt subscriber for a binary.
pub fn init_logging(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose, quiet))
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), Level::INFO);
        assert_eq!(log_level(1, false), Level::DEBUG);
        assert_eq!(log_level(4, false), Level::TRACE);
        assert_eq!(log_level(2, true), Level::WARN);
    }
}
