use tracing::{info, warn};

use crate::cli::Cli;
use crate::client::RateLimitedClient;
use crate::error::Result;
use crate::export::{export_channel, write_document};
use crate::settings::Settings;
use crate::slack::SlackProvider;
use crate::window::TimeWindow;
use crate::{check_token_format, load_token};

pub async fn run_export(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    let timezone = settings.timezone()?;

    // Validated before any request is made.
    let window = TimeWindow::parse(&cli.start, &cli.end, timezone)?;

    let token = load_token()?;
    if !check_token_format(&token) {
        warn!("SLACK_TOKEN does not start with a known prefix (xoxb-, xoxp-, xoxa-, xoxs-)");
    }

    let client = RateLimitedClient::new(SlackProvider::new(&token)?, settings.retry_policy());
    let identity = client.verify_auth().await?;
    info!(user_id = %identity, "authenticated");

    info!(
        channel = %cli.channel,
        start = %window.time_range().start,
        end = %window.time_range().end,
        "exporting channel"
    );
    let document = export_channel(&client, &cli.channel, &window, settings.page_limit(), timezone).await?;

    info!(output = %cli.output.display(), "writing export");
    write_document(&cli.output, &document, cli.pretty)?;

    info!(
        output = %cli.output.display(),
        total_messages = document.metadata.total_messages,
        total_thread_replies = document.metadata.total_thread_replies,
        total_unique_users = document.metadata.total_unique_users,
        "export completed"
    );
    Ok(())
}
