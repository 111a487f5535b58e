//! Request identity pool
//!
//! A fixed set of desktop browser signatures rotated across requests so
//! that consecutive fetches do not all carry the same user agent. The pool
//! is immutable configuration: it is built once and cloned (cheaply) into
//! the fetcher and the reveal extractor.

use crate::config::IdentityConfig;
use crate::ConfigError;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Built-in user agents used when the configuration does not supply any
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.2365.66",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 OPR/98.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 12.5; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_3_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

/// Immutable pool of user agents
#[derive(Debug, Clone)]
pub struct IdentityPool {
    agents: Arc<[String]>,
}

impl IdentityPool {
    /// Creates a pool from explicit agents
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::Validation)` - The list is empty
    pub fn new(agents: Vec<String>) -> Result<Self, ConfigError> {
        if agents.is_empty() {
            return Err(ConfigError::Validation(
                "identity pool needs at least one user agent".to_string(),
            ));
        }

        Ok(Self {
            agents: agents.into(),
        })
    }

    /// Creates the pool from configuration, falling back to the built-in agents
    pub fn from_config(config: &IdentityConfig) -> Result<Self, ConfigError> {
        match &config.user_agents {
            Some(agents) => Self::new(agents.clone()),
            None => Ok(Self::default()),
        }
    }

    /// Picks a user agent uniformly at random
    pub fn choose(&self) -> &str {
        // The constructor rejects empty pools, so `choose` always yields.
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_pool() {
        let pool = IdentityPool::default();
        assert_eq!(pool.len(), DEFAULT_USER_AGENTS.len());
        assert!(pool.contains(pool.choose()));
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(IdentityPool::new(vec![]).is_err());
    }

    #[test]
    fn test_from_config_override() {
        let config = IdentityConfig {
            user_agents: Some(vec!["OnlyAgent/1.0".to_string()]),
        };
        let pool = IdentityPool::from_config(&config).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.choose(), "OnlyAgent/1.0");
    }

    #[test]
    fn test_choose_rotates() {
        let pool = IdentityPool::new(vec!["A".to_string(), "B".to_string()]).unwrap();
        let seen: HashSet<&str> = (0..200).map(|_| pool.choose()).collect();
        assert_eq!(seen.len(), 2);
    }
}
