use vaultstream_api::{setup, telemetry};
use vaultstream_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    vaultstream_core::config::load_dotenv();

    let config = Config::from_env()?;
    config.validate()?;

    telemetry::init_telemetry();

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
