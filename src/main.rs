use anyhow::Result;
use clap::Parser;
use repack::core::config::{self, CONFIG_FILE};
use repack::core::logging;
use repack::core::packager::{self, GadgetMode, RepackEnv};
use std::path::PathBuf;

/// Repack the app with a Frida gadget, a new identity and its patches applied.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Let the gadget run scripts from a directory on the device instead of
    /// waiting for a client on loopback.
    #[arg(long)]
    standalone: bool,

    /// Recipe overrides.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();
    log::info!("repack {}", config::VERSION);

    let config = config::parse_config(&args.config)?;
    let env = RepackEnv::new(
        std::env::current_dir()?,
        config,
        GadgetMode::from_standalone_flag(args.standalone),
    );
    packager::build(&env)
}
