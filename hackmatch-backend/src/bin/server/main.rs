use hackmatch_backend::error::AppError;
use hackmatch_backend::run_server;
use hackmatch_backend::telemetry::setup_telemetry;
use hackmatch_config::get_config;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = get_config()?;
    setup_telemetry(&config.log_filter)?;
    run_server(config).await
}
