//! lesouvenir binary entry point

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leserve::cli::Cli::parse().run().await
}
