use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "slack-channel-export")]
#[command(about = "Export one Slack channel's messages, threads and reactions for a time window as JSON")]
#[command(version)]
pub struct Cli {
    /// Channel name to export (without the leading #)
    #[arg(short, long)]
    pub channel: String,

    /// Start time (YYYY-MM-DDTHH:MM:SS, in the configured timezone)
    #[arg(short, long)]
    pub start: String,

    /// End time (YYYY-MM-DDTHH:MM:SS, in the configured timezone)
    #[arg(short, long)]
    pub end: String,

    /// Output file path
    #[arg(short, long, default_value = "slack_export.json")]
    pub output: PathBuf,

    /// Write indented JSON
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Settings file (defaults to slack-export.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
