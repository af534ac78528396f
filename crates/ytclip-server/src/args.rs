use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ytclip-server")]
#[command(author, version, about = "Audio clip extraction service for remote video sources")]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long, env = "YTCLIP_HOST")]
    pub host: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long, env = "YTCLIP_PORT")]
    pub port: Option<u16>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
