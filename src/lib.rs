pub mod core;

use clap::Parser;

use crate::core::commands::{dispatch, Cli};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crate::core::logging::init(cli.verbose);
    dispatch(cli).await
}
