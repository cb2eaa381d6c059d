use tracing::debug;

use crate::Result;
use crate::client::{RateLimitedClient, Sleeper};
use crate::model::{Message, RawMessage, RawReaction, Reaction, Reply, UserRecord};
use crate::provider::{ChatProvider, next_cursor};
use crate::resolver::UserResolver;

/// Turns raw history messages into export messages: resolved author, the
/// whole thread for thread roots, and resolved reactors.
pub struct MessageEnricher<'a, P, S> {
    client: &'a RateLimitedClient<P, S>,
    channel_id: &'a str,
    page_limit: u16,
}

impl<'a, P: ChatProvider, S: Sleeper> MessageEnricher<'a, P, S> {
    pub fn new(client: &'a RateLimitedClient<P, S>, channel_id: &'a str, page_limit: u16) -> Self {
        Self {
            client,
            channel_id,
            page_limit,
        }
    }

    pub async fn enrich(&self, resolver: &mut UserResolver, raw: RawMessage) -> Result<Message> {
        let user_info = self.resolve_author(resolver, &raw).await?;

        let replies = if raw.is_thread_root() {
            let mut replies = Vec::new();
            for reply in self.fetch_replies(&raw.ts).await? {
                replies.push(self.enrich_reply(resolver, reply).await?);
            }
            replies
        } else {
            Vec::new()
        };

        let reactions = self.resolve_reactions(resolver, raw.reactions).await?;

        Ok(Message {
            kind: raw.kind,
            user: raw.user,
            user_info,
            text: raw.text.unwrap_or_default(),
            ts: raw.ts,
            thread_ts: raw.thread_ts,
            reactions,
            replies,
            extra: raw.extra,
        })
    }

    /// Every reply of the thread rooted at `thread_ts`, root excluded.
    ///
    /// Replies are not filtered by the export window: a late reply to an
    /// in-window message is still part of that conversation.
    pub async fn fetch_replies(&self, thread_ts: &str) -> Result<Vec<RawMessage>> {
        let mut replies = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .list_thread_replies(self.channel_id, thread_ts, cursor.as_deref(), self.page_limit)
                .await?;
            pages += 1;

            replies.extend(page.replies.into_iter().filter(|r| r.ts != thread_ts));

            match next_cursor(page.next_cursor) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(thread_ts, pages, replies = replies.len(), "fetched thread");
        Ok(replies)
    }

    async fn enrich_reply(&self, resolver: &mut UserResolver, raw: RawMessage) -> Result<Reply> {
        let user_info = self.resolve_author(resolver, &raw).await?;
        let reactions = self.resolve_reactions(resolver, raw.reactions).await?;

        Ok(Reply {
            kind: raw.kind,
            user: raw.user,
            user_info,
            text: raw.text.unwrap_or_default(),
            ts: raw.ts,
            thread_ts: raw.thread_ts,
            reactions,
            extra: raw.extra,
        })
    }

    async fn resolve_author(
        &self,
        resolver: &mut UserResolver,
        raw: &RawMessage,
    ) -> Result<Option<UserRecord>> {
        match raw.author() {
            Some(user_id) => Ok(Some(resolver.resolve(self.client, user_id).await?)),
            None => Ok(None),
        }
    }

    async fn resolve_reactions(
        &self,
        resolver: &mut UserResolver,
        reactions: Option<Vec<RawReaction>>,
    ) -> Result<Vec<Reaction>> {
        let mut resolved = Vec::new();

        for reaction in reactions.unwrap_or_default() {
            let users: Vec<String> = reaction.users.into_iter().filter(|u| !u.is_empty()).collect();
            if reaction.count != users.len() {
                // Slack truncates long reactor lists; the count follows the ids we export.
                debug!(
                    reaction = %reaction.name,
                    reported = reaction.count,
                    listed = users.len(),
                    "reaction count differs from listed users"
                );
            }

            let mut user_details = Vec::with_capacity(users.len());
            for user_id in &users {
                user_details.push(resolver.resolve(self.client, user_id).await?);
            }

            resolved.push(Reaction {
                name: reaction.name,
                count: users.len(),
                users,
                user_details,
            });
        }

        Ok(resolved)
    }
}
