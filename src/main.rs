use chatsub::config::load_config;
use chatsub::transport::run_server;
use chatsub::utils::logging;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("error");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log.level);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = ?err, "failed to install ctrl-c handler");
        }
    };

    if let Err(e) = run_server(&config, shutdown).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
