use std::process::ExitCode;

use tracing::{error, info};

use journeylog::{Config, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::var("JOURNEYLOG_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = journeylog::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        journeylog::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    info!(environment = ?config.environment, "journeylog starting");

    let server = match WebServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
