mod app;
mod cli;

use tracing::Level;
use triada::config::Config;

fn log_level(cli: &cli::Cli, config: Option<&Config>) -> Level {
    if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        config
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(Level::INFO)
    }
}

fn main() {
    let cli = cli::parse();

    // The config picks the final level, so loading it logs at the flag level
    let bootstrap = tracing_subscriber::fmt()
        .with_max_level(log_level(&cli, None))
        .with_writer(std::io::stderr)
        .finish();
    let loaded = tracing::subscriber::with_default(bootstrap, Config::load);

    tracing_subscriber::fmt()
        .with_max_level(log_level(&cli, loaded.as_ref().ok()))
        .with_writer(std::io::stderr)
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{:#}", e), "using built-in config defaults");
        Config::default()
    });

    app::run(cli, config);
}
