use clap::Parser;
use cmdgen::Cli;
use std::io;

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let level = if cli.debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut stdout = io::stdout().lock();
    cmdgen::run(&cli, &mut stdout)
}
