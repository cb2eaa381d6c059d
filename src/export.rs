//! The export pipeline: channel lookup, paginated history, per-message
//! enrichment and assembly into one document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppError, Result};
use crate::assembler::ExportAssembler;
use crate::client::{RateLimitedClient, Sleeper};
use crate::enricher::MessageEnricher;
use crate::model::ExportDocument;
use crate::paginator::HistoryPaginator;
use crate::provider::ChatProvider;
use crate::resolver::UserResolver;
use crate::window::TimeWindow;

/// Export one channel for `window`. All-or-nothing: any fatal error aborts
/// and no document is produced.
pub async fn export_channel<P, S>(
    client: &RateLimitedClient<P, S>,
    channel_name: &str,
    window: &TimeWindow,
    page_limit: u16,
    timezone: Tz,
) -> Result<ExportDocument>
where
    P: ChatProvider,
    S: Sleeper,
{
    let channel = client.lookup_channel(channel_name).await?;
    info!(channel = %channel.name, channel_id = %channel.id, "collecting channel history");

    let mut resolver = UserResolver::new();
    let enricher = MessageEnricher::new(client, &channel.id, page_limit);
    let mut history = HistoryPaginator::new(client, &channel.id, window, page_limit);
    let mut assembler = ExportAssembler::new(channel.clone(), window);

    while let Some(raw) = history.next_message().await? {
        let message = enricher.enrich(&mut resolver, raw).await?;
        assembler.push(message);
    }

    if assembler.is_empty() {
        warn!(channel = %channel.name, "no messages found in the requested window");
    }

    let document = assembler.finish(Utc::now().with_timezone(&timezone));
    info!(
        messages = document.metadata.total_messages,
        thread_replies = document.metadata.total_thread_replies,
        pages = history.pages_fetched(),
        "assembled export"
    );
    Ok(document)
}

pub fn write_document(path: &Path, document: &ExportDocument, pretty: bool) -> Result<()> {
    let file = File::create(path).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    write_json(&mut writer, document, pretty)?;
    writer.flush().map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

fn write_json<W: Write, T: Serialize>(writer: W, data: &T, pretty: bool) -> Result<()> {
    let result = if pretty {
        serde_json::to_writer_pretty(writer, data)
    } else {
        serde_json::to_writer(writer, data)
    };
    result.map_err(|e| AppError::JsonSerialize(e.to_string()))
}
