//! Round context configuration.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Default upper bound on transactions in one proposal.
pub const DEFAULT_MAX_TRANSACTIONS: usize = 65_535;

/// Configuration for a [`RoundContext`](crate::RoundContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Version stamped into headers and payload envelopes.
    pub version: u32,

    /// Largest transaction set a proposal may carry.
    pub max_transactions_per_block: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            version: 0,
            max_transactions_per_block: DEFAULT_MAX_TRANSACTIONS,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `DBFT_CONTEXT_VERSION` and `DBFT_MAX_BLOCK_TRANSACTIONS`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            version: env_or("DBFT_CONTEXT_VERSION", defaults.version)?,
            max_transactions_per_block: env_or(
                "DBFT_MAX_BLOCK_TRANSACTIONS",
                defaults.max_transactions_per_block,
            )?,
        })
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the maximum transactions per proposal.
    #[must_use]
    pub fn with_max_transactions(mut self, max: usize) -> Self {
        self.max_transactions_per_block = max;
        self
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.version, 0);
        assert_eq!(config.max_transactions_per_block, DEFAULT_MAX_TRANSACTIONS);
    }

    #[test]
    fn builders() {
        let config = ContextConfig::new().with_version(2).with_max_transactions(10);
        assert_eq!(config.version, 2);
        assert_eq!(config.max_transactions_per_block, 10);
    }

    #[test]
    fn env_parsing() {
        // Unique names so parallel tests don't race on shared variables.
        std::env::set_var("DBFT_TEST_CONFIG_OK", " 17 ");
        std::env::set_var("DBFT_TEST_CONFIG_BAD", "many");

        assert_eq!(env_or("DBFT_TEST_CONFIG_OK", 0u32).unwrap(), 17);
        assert_eq!(env_or("DBFT_TEST_CONFIG_UNSET", 5u32).unwrap(), 5);
        assert!(matches!(
            env_or("DBFT_TEST_CONFIG_BAD", 0usize),
            Err(Error::Config(_))
        ));
    }
}
