use clap::Parser;

use arena_core::config::ServerConfig;
use arena_core::server::ArenaServer;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    let server = ArenaServer::new(config);
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown signal received, draining connections");
            shutdown.trigger();
        }
    });

    if let Err(err) = server.run().await {
        log::error!("server exited with error: {err}");
        std::process::exit(1);
    }
}
