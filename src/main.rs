use clap::Parser;

use fyyur::{logging, AppConfig, CliArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = AppConfig::resolve(&args)?;
    logging::init_tracing(&config.log_filter)?;
    fyyur::run(config).await
}
