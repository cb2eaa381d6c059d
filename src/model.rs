use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::window::TimeRange;

/// Slack's built-in bot user, which `users.info` does not always return.
pub const SLACKBOT_ID: &str = "USLACKBOT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub display_name: String,
}

impl UserRecord {
    /// Record used when an identity cannot be looked up (deleted user, missing scope).
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            real_name: String::new(),
            display_name: String::new(),
        }
    }

    pub fn slackbot() -> Self {
        Self {
            id: SLACKBOT_ID.to_string(),
            name: "slackbot".to_string(),
            real_name: "Slackbot".to_string(),
            display_name: "Slackbot".to_string(),
        }
    }
}

/// A history or reply message as the provider returned it.
///
/// Only the fields the pipeline acts on are typed; everything else is kept in
/// `extra` and written back out untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<RawReaction>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_message_type() -> String {
    "message".to_string()
}

impl RawMessage {
    /// A thread root is the message whose `thread_ts` points at itself.
    /// Broadcast replies carry a foreign `thread_ts` and are not roots.
    pub fn is_thread_root(&self) -> bool {
        self.thread_ts.as_deref() == Some(self.ts.as_str())
    }

    /// Author id, ignoring empty strings some bot messages carry.
    pub fn author(&self) -> Option<&str> {
        self.user.as_deref().filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReaction {
    pub name: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reaction {
    pub name: String,
    pub count: usize,
    pub users: Vec<String>,
    pub user_details: Vec<UserRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserRecord>,
    pub text: String,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    pub reactions: Vec<Reaction>,
    pub replies: Vec<Reply>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Thread reply. Replies are flat: they never carry replies of their own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserRecord>,
    pub text: String,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    pub reactions: Vec<Reaction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Every resolved identity this message refers to: author, reactors, and
    /// the authors and reactors of its replies.
    pub fn user_records(&self) -> impl Iterator<Item = &UserRecord> {
        let own = self
            .user_info
            .iter()
            .chain(self.reactions.iter().flat_map(|r| r.user_details.iter()));
        let replies = self.replies.iter().flat_map(|reply| {
            reply
                .user_info
                .iter()
                .chain(reply.reactions.iter().flat_map(|r| r.user_details.iter()))
        });
        own.chain(replies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportMetadata {
    pub total_messages: usize,
    pub total_thread_replies: usize,
    pub total_unique_users: usize,
    pub export_time: String,
    pub exporter_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub channel: ChannelRef,
    pub time_range: TimeRange,
    pub messages: Vec<Message>,
    pub users: BTreeMap<String, UserRecord>,
    pub metadata: ExportMetadata,
}
