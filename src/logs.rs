use std::env::var;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use nestzip::Cli;

/// Set up stderr logging: `RUST_LOG` if set, otherwise from `-v`/`-q`.
pub fn init(cli: &Cli) {
    let filter = if var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match (cli.is_very_quiet(), cli.verbose) {
            (true, _) => "off",
            (false, 0) if cli.quiet > 0 => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        })
    };

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(_) => debug!("logging initialised"),
        Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
    }
}
