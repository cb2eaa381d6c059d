use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::Result;
use crate::client::{RateLimitedClient, Sleeper};
use crate::model::RawMessage;
use crate::provider::{ChatProvider, HistoryQuery, next_cursor};
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageState {
    Start,
    HasMore(String),
    Done,
}

/// Lazy walk over a channel's history inside a [`TimeWindow`].
///
/// Pages are requested one at a time, only once the previous page has been
/// handed out. The walk is finite and cannot be rewound; build a new
/// paginator to start over.
pub struct HistoryPaginator<'a, P, S> {
    client: &'a RateLimitedClient<P, S>,
    channel_id: &'a str,
    window: &'a TimeWindow,
    oldest: String,
    latest: String,
    page_limit: u16,
    state: PageState,
    buffer: VecDeque<RawMessage>,
    seen: HashSet<String>,
    pages_fetched: usize,
}

impl<'a, P: ChatProvider, S: Sleeper> HistoryPaginator<'a, P, S> {
    pub fn new(
        client: &'a RateLimitedClient<P, S>,
        channel_id: &'a str,
        window: &'a TimeWindow,
        page_limit: u16,
    ) -> Self {
        Self {
            client,
            channel_id,
            window,
            oldest: window.oldest_ts(),
            latest: window.latest_ts(),
            page_limit,
            state: PageState::Start,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next message in fetch order, or `None` once history is exhausted.
    ///
    /// A page failure ends the walk; later calls return `None`.
    pub async fn next_message(&mut self) -> Result<Option<RawMessage>> {
        loop {
            while let Some(message) = self.buffer.pop_front() {
                if !self.window.contains_ts(&message.ts) {
                    debug!(ts = %message.ts, "dropping message outside the export window");
                    continue;
                }
                if !self.seen.insert(message.ts.clone()) {
                    debug!(ts = %message.ts, "dropping message already returned by an earlier page");
                    continue;
                }
                return Ok(Some(message));
            }

            let cursor = match &self.state {
                PageState::Start => None,
                PageState::HasMore(cursor) => Some(cursor.clone()),
                PageState::Done => return Ok(None),
            };

            let query = HistoryQuery {
                channel_id: self.channel_id,
                oldest: &self.oldest,
                latest: &self.latest,
                cursor: cursor.as_deref(),
                limit: self.page_limit,
            };
            let page = match self.client.list_history(query).await {
                Ok(page) => page,
                Err(err) => {
                    self.state = PageState::Done;
                    return Err(err);
                }
            };
            self.pages_fetched += 1;

            debug!(
                channel_id = self.channel_id,
                page = self.pages_fetched,
                messages = page.messages.len(),
                "fetched history page"
            );

            self.state = match next_cursor(page.next_cursor) {
                Some(next) => PageState::HasMore(next),
                None => PageState::Done,
            };
            self.buffer.extend(page.messages);
        }
    }
}
