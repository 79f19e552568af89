//! Utilities for logging.
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    HumanReadable,
    Json,
}

/// Install a global subscriber writing to `writer`.
///
/// `level` is the default, directives in `RUST_LOG` take precedence. Only
/// the first call installs a subscriber, later calls are ignored.
pub fn configure_global_logger<W>(level: Level, format: LogFormat, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true);

    // Errors only when a subscriber was already installed.
    let _ = match format {
        LogFormat::HumanReadable => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Install a subscriber for tests, capturing output per test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::DEBUG.into())
                .from_env_lossy(),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_twice() {
        configure_global_logger(Level::INFO, LogFormat::Json, std::io::sink);
        configure_global_logger(Level::DEBUG, LogFormat::HumanReadable, std::io::stderr);
        tracing::info!("still logging");
    }
}
