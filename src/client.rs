//! Provider calls with rate-limit back-off.
//!
//! Every request goes through [`RateLimitedClient::call`], an explicit
//! attempt → wait → attempt loop. Only rate-limit responses are retried;
//! any other failure is returned at once, named after the call that failed.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::error::ProviderError;
use crate::model::{ChannelRef, UserRecord};
use crate::provider::{ChatProvider, HistoryPage, HistoryQuery, RepliesPage};
use crate::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a call is made at most `max_retries + 1` times.
    pub max_retries: u32,
    /// Wait used when the provider does not advise one.
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_delay: Duration::from_secs(60),
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A provider operation and its target, used in logs and fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall<'a> {
    AuthTest,
    LookupChannel { name: &'a str },
    History { channel_id: &'a str },
    Replies { channel_id: &'a str, thread_ts: &'a str },
    UserInfo { user_id: &'a str },
}

impl fmt::Display for ApiCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiCall::AuthTest => write!(f, "auth.test"),
            ApiCall::LookupChannel { name } => write!(f, "conversations.list(#{})", name),
            ApiCall::History { channel_id } => write!(f, "conversations.history({})", channel_id),
            ApiCall::Replies {
                channel_id,
                thread_ts,
            } => write!(f, "conversations.replies({}, {})", channel_id, thread_ts),
            ApiCall::UserInfo { user_id } => write!(f, "users.info({})", user_id),
        }
    }
}

pub struct RateLimitedClient<P, S = TokioSleeper> {
    provider: P,
    sleeper: S,
    policy: RetryPolicy,
}

impl<P: ChatProvider> RateLimitedClient<P, TokioSleeper> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self::with_sleeper(provider, TokioSleeper, policy)
    }
}

impl<P: ChatProvider, S: Sleeper> RateLimitedClient<P, S> {
    pub fn with_sleeper(provider: P, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            provider,
            sleeper,
            policy,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `request` until it succeeds, fails with a non-rate-limit error, or
    /// the retry budget is spent.
    pub async fn call<T, F, Fut>(&self, call: ApiCall<'_>, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match request().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(call = %call, attempt, "succeeded after rate limiting");
                    }
                    return Ok(value);
                }
                Err(ProviderError::RateLimited { retry_after }) => {
                    if attempt > self.policy.max_retries {
                        error!(call = %call, attempts = attempt, "rate limit retry budget exhausted");
                        return Err(AppError::SlackRateLimit {
                            call: call.to_string(),
                            attempts: attempt,
                        });
                    }
                    let wait = retry_after.unwrap_or(self.policy.default_delay);
                    warn!(
                        call = %call,
                        attempt,
                        max_retries = self.policy.max_retries,
                        wait_secs = wait.as_secs(),
                        "rate limited, waiting before retry"
                    );
                    self.sleeper.sleep(wait).await;
                }
                Err(other) => return Err(other.into_app_error(&call.to_string())),
            }
        }
    }

    pub async fn verify_auth(&self) -> Result<String> {
        let provider = &self.provider;
        self.call(ApiCall::AuthTest, move || provider.verify_auth()).await
    }

    pub async fn lookup_channel(&self, name: &str) -> Result<ChannelRef> {
        let provider = &self.provider;
        self.call(ApiCall::LookupChannel { name }, move || provider.lookup_channel(name))
            .await?
            .ok_or_else(|| AppError::ChannelNotFound(name.to_string()))
    }

    pub async fn list_history(&self, query: HistoryQuery<'_>) -> Result<HistoryPage> {
        let provider = &self.provider;
        let call = ApiCall::History {
            channel_id: query.channel_id,
        };
        self.call(call, move || provider.list_history(query)).await
    }

    pub async fn list_thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<&str>,
        limit: u16,
    ) -> Result<RepliesPage> {
        let provider = &self.provider;
        let call = ApiCall::Replies {
            channel_id,
            thread_ts,
        };
        self.call(call, move || {
            provider.list_thread_replies(channel_id, thread_ts, cursor, limit)
        })
        .await
    }

    pub async fn lookup_user(&self, user_id: &str) -> Result<UserRecord> {
        let provider = &self.provider;
        self.call(ApiCall::UserInfo { user_id }, move || provider.lookup_user(user_id))
            .await
    }
}
