mod api_doc;
mod auth;
mod error;
mod handlers;
mod setup;
mod state;
mod telemetry;

use picstore_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;
    let (state, router) = setup::initialize_app(config).await?;

    setup::server::start_server(&state.config, router).await?;

    Ok(())
}
