mod allocator;
mod config;
mod data;
mod error;
mod export;
mod registry;
mod roster;
mod server;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    server::run_server(&config).await
}
