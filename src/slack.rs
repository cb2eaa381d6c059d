//! [`ChatProvider`] over the Slack Web API, via slack-morphism.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use slack_morphism::errors::SlackClientError;
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::*;

use crate::error::ProviderError;
use crate::model::{ChannelRef, RawMessage, UserRecord};
use crate::provider::{ChatProvider, HistoryPage, HistoryQuery, RepliesPage, next_cursor};
use crate::{AppError, Result};

const CHANNEL_LIST_LIMIT: u16 = 200;

pub struct SlackProvider {
    client: SlackHyperClient,
    token: SlackApiToken,
}

impl SlackProvider {
    pub fn new(token: &str) -> Result<Self> {
        // hyper-rustls needs a process-wide crypto provider; a second install is a no-op.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let connector =
            SlackClientHyperConnector::new().map_err(|e| AppError::SlackConnector(e.to_string()))?;
        Ok(Self {
            client: SlackClient::new(connector),
            token: SlackApiToken::new(SlackApiTokenValue(token.to_string())),
        })
    }
}

fn classify(err: SlackClientError) -> ProviderError {
    match err {
        SlackClientError::RateLimitError(e) => ProviderError::RateLimited {
            retry_after: e.retry_after,
        },
        SlackClientError::ApiError(e) if is_rate_limit_code(&e.code) => {
            ProviderError::RateLimited { retry_after: None }
        }
        SlackClientError::ApiError(e) => ProviderError::Api { code: e.code },
        other => ProviderError::Transport(other.to_string()),
    }
}

fn is_rate_limit_code(code: &str) -> bool {
    code == "ratelimited" || code == "rate_limited"
}

fn cursor_of(metadata: Option<SlackResponseMetadata>) -> Option<String> {
    next_cursor(metadata.and_then(|meta| meta.next_cursor).map(|cursor| cursor.0))
}

/// Body of `conversations.history` and `conversations.replies`, decoded from
/// the wire straight into [`RawMessage`] so unmodelled fields survive.
#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    response_metadata: Option<PageMetadata>,
}

#[derive(Debug, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl MessagePage {
    fn into_parts(self) -> (Vec<RawMessage>, Option<String>) {
        let cursor = next_cursor(self.response_metadata.and_then(|meta| meta.next_cursor));
        (self.messages, cursor)
    }
}

fn str_at<'v>(value: &'v Value, path: &[&str]) -> Option<&'v str> {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(Value::as_str)
}

fn channel_ref(info: &SlackChannelInfo, name: &str) -> std::result::Result<ChannelRef, ProviderError> {
    let value = serde_json::to_value(info).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    Ok(ChannelRef {
        id: info.id.0.clone(),
        name: name.to_string(),
        topic: str_at(&value, &["topic", "value"]).unwrap_or_default().to_string(),
        purpose: str_at(&value, &["purpose", "value"]).unwrap_or_default().to_string(),
    })
}

fn user_record(user_id: &str, user: &SlackUser) -> std::result::Result<UserRecord, ProviderError> {
    let value = serde_json::to_value(user).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let real_name = str_at(&value, &["real_name"]).or_else(|| str_at(&value, &["profile", "real_name"]));
    Ok(UserRecord {
        id: user_id.to_string(),
        name: str_at(&value, &["name"]).unwrap_or_default().to_string(),
        real_name: real_name.unwrap_or_default().to_string(),
        display_name: str_at(&value, &["profile", "display_name"])
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl ChatProvider for SlackProvider {
    async fn verify_auth(&self) -> std::result::Result<String, ProviderError> {
        let session = self.client.open_session(&self.token);
        let response = session.auth_test().await.map_err(classify)?;
        Ok(response.user_id.0)
    }

    async fn lookup_channel(&self, name: &str) -> std::result::Result<Option<ChannelRef>, ProviderError> {
        let session = self.client.open_session(&self.token);
        let mut cursor: Option<SlackCursorId> = None;

        loop {
            let request = SlackApiConversationsListRequest::new()
                .with_limit(CHANNEL_LIST_LIMIT)
                .with_types(vec![SlackConversationType::Public, SlackConversationType::Private])
                .opt_cursor(cursor);

            let response = session.conversations_list(&request).await.map_err(classify)?;

            if let Some(channel) = response
                .channels
                .iter()
                .find(|c| c.name.as_deref() == Some(name))
            {
                return channel_ref(channel, name).map(Some);
            }

            match cursor_of(response.response_metadata) {
                Some(next) => cursor = Some(SlackCursorId(next)),
                None => return Ok(None),
            }
        }
    }

    async fn list_history(&self, query: HistoryQuery<'_>) -> std::result::Result<HistoryPage, ProviderError> {
        let session = self.client.open_session(&self.token);
        let params = vec![
            ("channel", Some(query.channel_id.to_string())),
            ("oldest", Some(query.oldest.to_string())),
            ("latest", Some(query.latest.to_string())),
            ("inclusive", Some("true".to_string())),
            ("limit", Some(query.limit.to_string())),
            ("cursor", query.cursor.map(str::to_string)),
        ];

        let page: MessagePage = session
            .http_session_api
            .http_get("conversations.history", &params, Some(&SLACK_TIER3_METHOD_CONFIG))
            .await
            .map_err(classify)?;

        let (messages, next_cursor) = page.into_parts();
        Ok(HistoryPage { messages, next_cursor })
    }

    async fn list_thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<&str>,
        limit: u16,
    ) -> std::result::Result<RepliesPage, ProviderError> {
        let session = self.client.open_session(&self.token);
        let params = vec![
            ("channel", Some(channel_id.to_string())),
            ("ts", Some(thread_ts.to_string())),
            ("limit", Some(limit.to_string())),
            ("cursor", cursor.map(str::to_string)),
        ];

        let page: MessagePage = session
            .http_session_api
            .http_get("conversations.replies", &params, Some(&SLACK_TIER3_METHOD_CONFIG))
            .await
            .map_err(classify)?;

        let (replies, next_cursor) = page.into_parts();
        Ok(RepliesPage { replies, next_cursor })
    }

    async fn lookup_user(&self, user_id: &str) -> std::result::Result<UserRecord, ProviderError> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

        let response = session.users_info(&request).await.map_err(classify)?;
        user_record(user_id, &response.user)
    }
}
