use std::process::exit;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathprobe=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = pathprobe::app::run_cli() {
        eprintln!("{e}");
        exit(1);
    }
}
