use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::model::{ChannelRef, ExportDocument, ExportMetadata, Message, UserRecord};
use crate::window::{TimeRange, TimeWindow, to_iso};

pub const EXPORTER_VERSION: &str = "1.0.0";

/// Accumulates enriched messages into the final [`ExportDocument`].
///
/// Pure aggregation: no provider access.
#[derive(Debug)]
pub struct ExportAssembler {
    channel: ChannelRef,
    time_range: TimeRange,
    messages: Vec<Message>,
    users: BTreeMap<String, UserRecord>,
    total_thread_replies: usize,
}

impl ExportAssembler {
    pub fn new(channel: ChannelRef, window: &TimeWindow) -> Self {
        Self {
            channel,
            time_range: window.time_range(),
            messages: Vec::new(),
            users: BTreeMap::new(),
            total_thread_replies: 0,
        }
    }

    pub fn push(&mut self, message: Message) {
        for record in message.user_records() {
            if !self.users.contains_key(&record.id) {
                self.users.insert(record.id.clone(), record.clone());
            }
        }
        self.total_thread_replies += message.replies.len();
        self.messages.push(message);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn finish(self, export_time: DateTime<Tz>) -> ExportDocument {
        ExportDocument {
            metadata: ExportMetadata {
                total_messages: self.messages.len(),
                total_thread_replies: self.total_thread_replies,
                total_unique_users: self.users.len(),
                export_time: to_iso(&export_time),
                exporter_version: EXPORTER_VERSION.to_string(),
            },
            channel: self.channel,
            time_range: self.time_range,
            messages: self.messages,
            users: self.users,
        }
    }
}
