#![forbid(unsafe_code)]

//! Container configuration.
//!
//! A [`ContainerConfig`] controls how subscriber callbacks are invoked and
//! how much capacity the backing storage reserves up front. Configs can be
//! built in code or read from the environment:
//!
//! | Variable                  | Values                   | Default     |
//! |---------------------------|--------------------------|-------------|
//! | `OBSERVABLE_SEQ_DISPATCH` | `propagate` \| `isolate` | `propagate` |
//! | `OBSERVABLE_SEQ_CAPACITY` | non-negative integer     | `0`         |

use crate::error::{ContainerError, ContainerResult};

/// Environment variable selecting the [`DispatchPolicy`].
pub const DISPATCH_ENV: &str = "OBSERVABLE_SEQ_DISPATCH";
/// Environment variable holding the initial capacity hint.
pub const CAPACITY_ENV: &str = "OBSERVABLE_SEQ_CAPACITY";

/// What happens when a subscriber callback panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// The panic unwinds out of the call that triggered dispatch.
    /// Subscribers after the panicking one miss that event.
    #[default]
    Propagate,
    /// Each callback runs under `catch_unwind`. A panic is logged and the
    /// remaining subscribers still receive the event.
    Isolate,
}

impl DispatchPolicy {
    fn parse(value: &str) -> ContainerResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "isolate" => Ok(Self::Isolate),
            other => Err(ContainerError::InvalidConfig(format!(
                "{DISPATCH_ENV}: expected 'propagate' or 'isolate', got '{other}'"
            ))),
        }
    }
}

/// Configuration for an observable container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Callback panic handling.
    pub dispatch_policy: DispatchPolicy,
    /// Capacity hint passed to the backing storage on construction.
    pub initial_capacity: usize,
}

impl ContainerConfig {
    /// Config that isolates subscriber panics.
    #[must_use]
    pub fn isolated() -> Self {
        Self::default().with_dispatch_policy(DispatchPolicy::Isolate)
    }

    #[must_use]
    pub fn with_dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.dispatch_policy = policy;
        self
    }

    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Read the config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidConfig`] if a variable is set but
    /// cannot be parsed.
    pub fn from_env() -> ContainerResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read the config through a custom environment lookup.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidConfig`] if a variable is set but
    /// cannot be parsed.
    pub fn from_env_with<F>(get_env: F) -> ContainerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env(DISPATCH_ENV) {
            config.dispatch_policy = DispatchPolicy::parse(&value)?;
        }
        if let Some(value) = get_env(CAPACITY_ENV) {
            config.initial_capacity = value.trim().parse().map_err(|_| {
                ContainerError::InvalidConfig(format!(
                    "{CAPACITY_ENV}: expected a non-negative integer, got '{value}'"
                ))
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_propagates() {
        let config = ContainerConfig::default();
        assert_eq!(config.dispatch_policy, DispatchPolicy::Propagate);
        assert_eq!(config.initial_capacity, 0);
    }

    #[test]
    fn builders() {
        let config = ContainerConfig::isolated().with_initial_capacity(64);
        assert_eq!(config.dispatch_policy, DispatchPolicy::Isolate);
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn env_unset_is_default() {
        let config = ContainerConfig::from_env_with(lookup(&[])).unwrap();
        assert_eq!(config, ContainerConfig::default());
    }

    #[test]
    fn env_values_parsed() {
        let config = ContainerConfig::from_env_with(lookup(&[
            (DISPATCH_ENV, " Isolate "),
            (CAPACITY_ENV, "128"),
        ]))
        .unwrap();
        assert_eq!(config.dispatch_policy, DispatchPolicy::Isolate);
        assert_eq!(config.initial_capacity, 128);
    }

    #[test]
    fn env_bad_policy_rejected() {
        let err = ContainerConfig::from_env_with(lookup(&[(DISPATCH_ENV, "swallow")]))
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidConfig(_)));
    }

    #[test]
    fn env_bad_capacity_rejected() {
        let err =
            ContainerConfig::from_env_with(lookup(&[(CAPACITY_ENV, "-3")])).unwrap_err();
        assert!(err.to_string().contains(CAPACITY_ENV));
    }
}
