use clap::Parser;
use slack_channel_export::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    slack_channel_export::setup_logging(cli.verbose);

    if let Err(e) = slack_channel_export::commands::run_export(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
