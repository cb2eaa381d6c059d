use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("SLACK_TOKEN environment variable not set")]
    MissingToken,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid date format: {0} (expected YYYY-MM-DDTHH:MM:SS)")]
    InvalidDate(String),

    #[error("invalid time window: start {start} must be before end {end}")]
    InvalidTimeWindow { start: String, end: String },

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("channel '{0}' not found (check the name and that the token can see it)")]
    ChannelNotFound(String),

    #[error("Slack API error in {call}: {code}")]
    SlackApi { call: String, code: String },

    #[error("Slack rate limit error: {call} still rate limited after {attempts} attempts")]
    SlackRateLimit { call: String, attempts: u32 },

    #[error("failed to create Slack client connector: {0}")]
    SlackConnector(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonSerialize(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single provider call, before any retry decision is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("{code}")]
    Api { code: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn api(code: impl Into<String>) -> Self {
        ProviderError::Api { code: code.into() }
    }

    /// Promote a non-retryable provider failure into a fatal error naming the call.
    pub fn into_app_error(self, call: &str) -> AppError {
        let code = match self {
            ProviderError::RateLimited { .. } => "ratelimited".to_string(),
            ProviderError::Api { code } => code,
            ProviderError::Transport(msg) => msg,
            ProviderError::Malformed(msg) => format!("malformed response: {}", msg),
        };
        AppError::SlackApi {
            call: call.to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_missing_token_display() {
        let err = AppError::MissingToken;
        assert_eq!(err.to_string(), "SLACK_TOKEN environment variable not set");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().starts_with("IO error:"));
    }

    #[test]
    fn test_invalid_date_display() {
        let err = AppError::InvalidDate("2023/01/01".to_string());
        assert!(err.to_string().contains("2023/01/01"));
        assert!(err.to_string().contains("YYYY-MM-DDTHH:MM:SS"));
    }

    #[test]
    fn test_invalid_time_window_display() {
        let err = AppError::InvalidTimeWindow {
            start: "2023-01-02T00:00:00".to_string(),
            end: "2023-01-01T00:00:00".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid time window: start 2023-01-02T00:00:00 must be before end 2023-01-01T00:00:00"
        );
    }

    #[test]
    fn test_channel_not_found_names_channel() {
        let err = AppError::ChannelNotFound("general".to_string());
        assert!(err.to_string().contains("'general'"));
    }

    #[test]
    fn test_slack_api_display_names_call() {
        let err = AppError::SlackApi {
            call: "users.info(U123)".to_string(),
            code: "user_not_found".to_string(),
        };
        assert_eq!(err.to_string(), "Slack API error in users.info(U123): user_not_found");
    }

    #[test]
    fn test_slack_rate_limit_display() {
        let err = AppError::SlackRateLimit {
            call: "conversations.history(C1)".to_string(),
            attempts: 6,
        };
        assert_eq!(
            err.to_string(),
            "Slack rate limit error: conversations.history(C1) still rate limited after 6 attempts"
        );
    }

    #[test]
    fn test_write_file_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let err = AppError::WriteFile {
            path: "/path/to/output.json".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("/path/to/output.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_provider_error_into_app_error() {
        let err = ProviderError::api("not_in_channel").into_app_error("conversations.replies(C1, 1.0)");
        match err {
            AppError::SlackApi { call, code } => {
                assert_eq!(call, "conversations.replies(C1, 1.0)");
                assert_eq!(code, "not_in_channel");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
        assert_send_sync::<ProviderError>();
    }
}
