use anyhow::Context;
use clap::Parser;
use watershed_join::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("watershed-join failed")
}
