//! Scripted in-memory provider and helpers shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::Sleeper;
use crate::error::ProviderError;
use crate::model::{ChannelRef, RawMessage, UserRecord};
use crate::provider::{ChatProvider, HistoryPage, HistoryQuery, RepliesPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Auth,
    Channel,
    History,
    Replies,
    User,
}

/// A history request as the provider saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenHistoryQuery {
    pub channel_id: String,
    pub oldest: String,
    pub latest: String,
    pub cursor: Option<String>,
}

/// Provider whose pages are addressed by cursors `page-1`, `page-2`, ...
#[derive(Default)]
pub struct MockProvider {
    channels: Vec<ChannelRef>,
    history: Vec<Vec<RawMessage>>,
    threads: HashMap<String, Vec<Vec<RawMessage>>>,
    users: HashMap<String, UserRecord>,
    failures: Mutex<HashMap<Op, VecDeque<ProviderError>>>,
    calls: Mutex<HashMap<Op, usize>>,
    user_lookups: Mutex<HashMap<String, usize>>,
    history_queries: Mutex<Vec<SeenHistoryQuery>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: ChannelRef) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_history_pages(mut self, pages: Vec<Vec<RawMessage>>) -> Self {
        self.history = pages;
        self
    }

    /// Pages of `conversations.replies`; like Slack, each page should start
    /// with the thread root.
    pub fn with_thread(mut self, thread_ts: &str, pages: Vec<Vec<RawMessage>>) -> Self {
        self.threads.insert(thread_ts.to_string(), pages);
        self
    }

    pub fn with_user(mut self, record: UserRecord) -> Self {
        self.users.insert(record.id.clone(), record);
        self
    }

    /// Queue an error returned by the next call of `op` instead of its result.
    pub fn fail_next(&self, op: Op, err: ProviderError) {
        let mut failures = self.failures.lock().unwrap();
        failures.entry(op).or_default().push_back(err);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn user_lookups(&self, user_id: &str) -> usize {
        self.user_lookups.lock().unwrap().get(user_id).copied().unwrap_or(0)
    }

    pub fn history_queries(&self) -> Vec<SeenHistoryQuery> {
        self.history_queries.lock().unwrap().clone()
    }

    fn record(&self, op: Op) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op).and_then(|queue| queue.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn cursor_after(index: usize, total: usize) -> Option<String> {
    (index + 1 < total).then(|| format!("page-{}", index + 1))
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn verify_auth(&self) -> Result<String, ProviderError> {
        self.record(Op::Auth)?;
        Ok("U_EXPORTER".to_string())
    }

    async fn lookup_channel(&self, name: &str) -> Result<Option<ChannelRef>, ProviderError> {
        self.record(Op::Channel)?;
        Ok(self.channels.iter().find(|c| c.name == name).cloned())
    }

    async fn list_history(&self, query: HistoryQuery<'_>) -> Result<HistoryPage, ProviderError> {
        self.history_queries.lock().unwrap().push(SeenHistoryQuery {
            channel_id: query.channel_id.to_string(),
            oldest: query.oldest.to_string(),
            latest: query.latest.to_string(),
            cursor: query.cursor.map(str::to_string),
        });
        self.record(Op::History)?;
        let index = page_index(query.cursor);
        Ok(HistoryPage {
            messages: self.history.get(index).cloned().unwrap_or_default(),
            next_cursor: cursor_after(index, self.history.len()),
        })
    }

    async fn list_thread_replies(
        &self,
        _channel_id: &str,
        thread_ts: &str,
        cursor: Option<&str>,
        _limit: u16,
    ) -> Result<RepliesPage, ProviderError> {
        self.record(Op::Replies)?;
        let pages = self.threads.get(thread_ts).cloned().unwrap_or_default();
        let index = page_index(cursor);
        Ok(RepliesPage {
            replies: pages.get(index).cloned().unwrap_or_default(),
            next_cursor: cursor_after(index, pages.len()),
        })
    }

    async fn lookup_user(&self, user_id: &str) -> Result<UserRecord, ProviderError> {
        *self
            .user_lookups
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default() += 1;
        self.record(Op::User)?;
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProviderError::api("user_not_found"))
    }
}

/// Sleeper that records requested waits and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn user(id: &str, name: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        name: name.to_string(),
        real_name: format!("{} real", name),
        display_name: format!("{} display", name),
    }
}

pub fn channel(id: &str, name: &str) -> ChannelRef {
    ChannelRef {
        id: id.to_string(),
        name: name.to_string(),
        topic: format!("{} topic", name),
        purpose: format!("{} purpose", name),
    }
}

pub fn raw(value: Value) -> RawMessage {
    serde_json::from_value(value).unwrap()
}

pub fn msg(ts: &str, user: &str, text: &str) -> RawMessage {
    raw(json!({"type": "message", "ts": ts, "user": user, "text": text}))
}

pub fn thread_root(ts: &str, user: &str, text: &str, reply_count: usize) -> RawMessage {
    raw(json!({
        "type": "message",
        "ts": ts,
        "thread_ts": ts,
        "user": user,
        "text": text,
        "reply_count": reply_count,
    }))
}

pub fn reply(ts: &str, thread_ts: &str, user: &str, text: &str) -> RawMessage {
    raw(json!({"type": "message", "ts": ts, "thread_ts": thread_ts, "user": user, "text": text}))
}
