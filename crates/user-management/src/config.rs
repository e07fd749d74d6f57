//! User management configuration.
//!
//! Configuration is loaded from environment variables; every setting has a default, so an
//! empty environment yields [`UserManagementOptions::default`].

use actor_runtime::RuntimeConfig;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default idle window before a user actor is deactivated, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 300;

/// Default per-user mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Default time budget for a single collaborator call, in milliseconds.
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 30_000;

/// Default `changed_by` stamped on published events.
pub const DEFAULT_CHANGED_BY: &str = "system";

/// Default CloudEvents `source`.
pub const DEFAULT_EVENT_SOURCE: &str = "identity.users";

/// Default lifetime of a minted token, in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserManagementOptions {
    /// Mailbox and idle eviction settings for the user actors.
    pub runtime: RuntimeConfig,

    /// Upper bound on any single store, provider or publisher call.
    pub collaborator_timeout: Duration,

    /// Recorded as `changed_by` on every published event.
    pub changed_by: String,

    /// Skip the identity provider claims sync (local development).
    pub disable_provider_sync: bool,

    /// CloudEvents `source` for published events.
    pub event_source: String,

    /// Token lifetime used when the caller does not pick one.
    pub default_token_ttl_minutes: u32,
}

impl Default for UserManagementOptions {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default()
                .with_idle_timeout(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECONDS))
                .with_mailbox_capacity(DEFAULT_MAILBOX_CAPACITY),
            collaborator_timeout: Duration::from_millis(DEFAULT_COLLABORATOR_TIMEOUT_MS),
            changed_by: DEFAULT_CHANGED_BY.to_string(),
            disable_provider_sync: false,
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            default_token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid idle timeout configuration: {0}")]
    InvalidIdleTimeout(String),

    #[error("Invalid mailbox capacity configuration: {0}")]
    InvalidMailboxCapacity(String),

    #[error("Invalid collaborator timeout configuration: {0}")]
    InvalidCollaboratorTimeout(String),

    #[error("Invalid token TTL configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid boolean for {name}: {value}")]
    InvalidFlag { name: &'static str, value: String },
}

impl UserManagementOptions {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let idle_timeout_seconds = parse_positive(
            vars,
            "USER_ACTOR_IDLE_TIMEOUT_SECONDS",
            DEFAULT_IDLE_TIMEOUT_SECONDS,
            ConfigError::InvalidIdleTimeout,
        )?;

        let mailbox_capacity = parse_positive(
            vars,
            "USER_ACTOR_MAILBOX_CAPACITY",
            DEFAULT_MAILBOX_CAPACITY as u64,
            ConfigError::InvalidMailboxCapacity,
        )?;

        let collaborator_timeout_ms = parse_positive(
            vars,
            "COLLABORATOR_TIMEOUT_MS",
            DEFAULT_COLLABORATOR_TIMEOUT_MS,
            ConfigError::InvalidCollaboratorTimeout,
        )?;

        let default_token_ttl_minutes = parse_positive(
            vars,
            "TOKEN_TTL_MINUTES",
            u64::from(DEFAULT_TOKEN_TTL_MINUTES),
            ConfigError::InvalidTokenTtl,
        )?;
        let default_token_ttl_minutes = u32::try_from(default_token_ttl_minutes).map_err(|_| {
            ConfigError::InvalidTokenTtl(format!(
                "TOKEN_TTL_MINUTES is too large, got {}",
                default_token_ttl_minutes
            ))
        })?;

        let changed_by = vars
            .get("EVENTS_CHANGED_BY")
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_CHANGED_BY.to_string());

        let event_source = vars
            .get("EVENTS_SOURCE")
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string());

        let disable_provider_sync = match vars.get("DISABLE_PROVIDER_SYNC") {
            Some(value) => parse_flag("DISABLE_PROVIDER_SYNC", value)?,
            None => false,
        };

        Ok(Self {
            runtime: RuntimeConfig::default()
                .with_idle_timeout(Duration::from_secs(idle_timeout_seconds))
                .with_mailbox_capacity(mailbox_capacity as usize),
            collaborator_timeout: Duration::from_millis(collaborator_timeout_ms),
            changed_by,
            disable_provider_sync,
            event_source,
            default_token_ttl_minutes,
        })
    }
}

fn parse_positive(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    error: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.trim().parse().map_err(|e| {
        error(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(error(format!("{} must be greater than 0", name)));
    }

    Ok(value)
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let options = UserManagementOptions::from_vars(&HashMap::new()).unwrap();
        assert_eq!(options, UserManagementOptions::default());
        assert_eq!(options.runtime.idle_timeout, Duration::from_secs(300));
        assert_eq!(options.runtime.mailbox_capacity, 32);
        assert_eq!(options.collaborator_timeout, Duration::from_secs(30));
        assert_eq!(options.changed_by, "system");
        assert_eq!(options.event_source, "identity.users");
        assert_eq!(options.default_token_ttl_minutes, 15);
        assert!(!options.disable_provider_sync);
    }

    #[test]
    fn test_overrides_are_applied() {
        let options = UserManagementOptions::from_vars(&vars(&[
            ("USER_ACTOR_IDLE_TIMEOUT_SECONDS", "60"),
            ("USER_ACTOR_MAILBOX_CAPACITY", "8"),
            ("COLLABORATOR_TIMEOUT_MS", "250"),
            ("EVENTS_CHANGED_BY", "admin-console"),
            ("EVENTS_SOURCE", "identity.test"),
            ("DISABLE_PROVIDER_SYNC", "true"),
            ("TOKEN_TTL_MINUTES", "60"),
        ]))
        .unwrap();

        assert_eq!(options.runtime.idle_timeout, Duration::from_secs(60));
        assert_eq!(options.runtime.mailbox_capacity, 8);
        assert_eq!(options.collaborator_timeout, Duration::from_millis(250));
        assert_eq!(options.changed_by, "admin-console");
        assert_eq!(options.event_source, "identity.test");
        assert!(options.disable_provider_sync);
        assert_eq!(options.default_token_ttl_minutes, 60);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = UserManagementOptions::from_vars(&vars(&[(
            "USER_ACTOR_IDLE_TIMEOUT_SECONDS",
            "soon",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdleTimeout(_)));

        let err =
            UserManagementOptions::from_vars(&vars(&[("USER_ACTOR_MAILBOX_CAPACITY", "0")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMailboxCapacity(_)));
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let err = UserManagementOptions::from_vars(&vars(&[("DISABLE_PROVIDER_SYNC", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFlag {
                name: "DISABLE_PROVIDER_SYNC",
                ..
            }
        ));
    }

    #[test]
    fn test_blank_strings_fall_back_to_defaults() {
        let options =
            UserManagementOptions::from_vars(&vars(&[("EVENTS_CHANGED_BY", "  ")])).unwrap();
        assert_eq!(options.changed_by, DEFAULT_CHANGED_BY);
    }
}
