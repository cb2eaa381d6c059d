use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::{RateLimitedClient, Sleeper};
use crate::model::{SLACKBOT_ID, UserRecord};
use crate::provider::ChatProvider;
use crate::{AppError, Result};

/// Run-scoped cache of user identities.
///
/// Each id is looked up at most once per run. The resolver is owned by the
/// export loop and lent out as `&mut` to whichever step needs a lookup, so
/// there is exactly one writer at a time.
#[derive(Debug, Default)]
pub struct UserResolver {
    cache: HashMap<String, UserRecord>,
}

impl UserResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `user_id`, hitting the provider only on the first request.
    ///
    /// A failed lookup yields a placeholder record that is cached like any
    /// other. Running out of rate-limit retries is still fatal.
    pub async fn resolve<P, S>(
        &mut self,
        client: &RateLimitedClient<P, S>,
        user_id: &str,
    ) -> Result<UserRecord>
    where
        P: ChatProvider,
        S: Sleeper,
    {
        if let Some(record) = self.cache.get(user_id) {
            return Ok(record.clone());
        }

        let record = if user_id == SLACKBOT_ID {
            UserRecord::slackbot()
        } else {
            match client.lookup_user(user_id).await {
                Ok(record) => {
                    debug!(user_id, name = %record.name, "resolved user");
                    record
                }
                Err(err @ AppError::SlackRateLimit { .. }) => return Err(err),
                Err(err) => {
                    warn!(user_id, error = %err, "user lookup failed, using placeholder");
                    UserRecord::placeholder(user_id)
                }
            }
        };

        self.cache.insert(user_id.to_string(), record.clone());
        Ok(record)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.cache.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
