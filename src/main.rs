use clap::Parser;
use grid_heat_processor::cli::{run, Cli};
use grid_heat_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
