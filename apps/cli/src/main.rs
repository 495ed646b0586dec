//! OutputKit CLI: processes raw agent outputs from disk and renders
//! validated, formatted, and aggregated reports.

mod commands;
mod inputs;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
