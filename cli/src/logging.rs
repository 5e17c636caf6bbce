use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,sizeproxy_engine=info";
const VERBOSE_FILTER: &str = "info,sizeproxy_engine=debug,sizeproxy=debug";
const TRACE_FILTER: &str = "debug,sizeproxy_engine=trace,sizeproxy=trace";

/// Logs go to stderr; stdout carries rewritten HTML and plan output.
/// `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_FILTER,
        1 => VERBOSE_FILTER,
        _ => TRACE_FILTER,
    }
}
