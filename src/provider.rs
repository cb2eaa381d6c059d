//! The four remote operations the export pipeline depends on.
//!
//! [`crate::slack::SlackProvider`] implements them over the Slack Web API; tests use
//! a scripted in-memory provider.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::model::{ChannelRef, RawMessage, UserRecord};

/// One page of `conversations.history`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub messages: Vec<RawMessage>,
    pub next_cursor: Option<String>,
}

/// One page of `conversations.replies`. Slack includes the thread root in
/// every page; callers filter it out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepliesPage {
    pub replies: Vec<RawMessage>,
    pub next_cursor: Option<String>,
}

/// Arguments of a bounded history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery<'a> {
    pub channel_id: &'a str,
    pub oldest: &'a str,
    pub latest: &'a str,
    pub cursor: Option<&'a str>,
    pub limit: u16,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Identity behind the credential, used as an early token check.
    async fn verify_auth(&self) -> Result<String, ProviderError>;

    /// `None` when no visible channel carries that name.
    async fn lookup_channel(&self, name: &str) -> Result<Option<ChannelRef>, ProviderError>;

    async fn list_history(&self, query: HistoryQuery<'_>) -> Result<HistoryPage, ProviderError>;

    async fn list_thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<RepliesPage, ProviderError>;

    async fn lookup_user(&self, user_id: &str) -> Result<UserRecord, ProviderError>;
}

/// Normalizes Slack's "no more pages" encodings (absent or empty cursor).
pub fn next_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.is_empty())
}
