use tracing::{error, info};

use treevault::{Config, HierarchyService, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = treevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        treevault::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("treevault starting");
    info!("Database: {}", config.database.path);
    info!("Blob root: {}", config.storage.root);

    let service = match HierarchyService::from_config(&config).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to open stores: {}", e);
            std::process::exit(1);
        }
    };

    let server = match WebServer::new(&config.server, service) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        std::process::exit(1);
    }

    info!("treevault stopped");
}
