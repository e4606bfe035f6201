use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "fc-roster-bridge", version, about = "Free Company roster service and Discord RSVP bridge")]
pub struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    pub check_config: bool,

    /// Serve the HTTP API without connecting to the Discord gateway.
    #[arg(long)]
    pub no_discord: bool,
}
