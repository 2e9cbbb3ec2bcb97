use anyhow::Result;
use clap::Parser;
use mailsteward::Config;
use mailsteward::cli::Cli;
use mailsteward::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;
    init_tracing(&config.observability);
    mailsteward::app::dispatch(cli, config).await
}
