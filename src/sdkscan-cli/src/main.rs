mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;
use commands::find::KeyFiles;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The binary shares the library's crate name, so one directive covers both
    let default_filter = if cli.verbose {
        "sdkscan=debug"
    } else {
        "sdkscan=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Find {
            input,
            outdir,
            keyset,
            titlekeys,
            devkeys,
            dev,
        } => {
            let config = Config::load()?;
            let key_files = KeyFiles::resolve(keyset, titlekeys, devkeys, &config);
            commands::find::handle(&input, &outdir, &key_files, dev)?;
        }

        Commands::Configure {
            keyset,
            title_keys,
            dev_keyset,
            show,
        } => {
            commands::configure::handle(keyset, title_keys, dev_keyset, show)?;
        }
    }

    Ok(())
}
