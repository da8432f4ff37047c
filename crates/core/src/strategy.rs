//! Mapping from request class to caching strategy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classify::RequestClass;
use crate::config::AppConfig;

/// Order in which cache and network are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Straight to the network; the store is never touched.
    NetworkOnly,
    /// Network (refreshing the stored entry on success), falling back to the
    /// stored entry for the exact key.
    NetworkFirst,
    /// Stored entry if present, otherwise network with populate.
    CacheFirst,
}

/// How navigable (shell) requests are served.
///
/// `NetworkOnly` keeps the application shell fresh after every deploy.
/// `CacheFirst` is the aggressive alternative and must be opted into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShellPolicy {
    #[default]
    NetworkOnly,
    NetworkFirst,
    CacheFirst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySelector {
    shell: ShellPolicy,
}

impl StrategySelector {
    pub fn new(shell: ShellPolicy) -> Self {
        Self { shell }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.shell_policy)
    }

    pub fn select(&self, class: RequestClass) -> Strategy {
        match class {
            RequestClass::NonIdempotent | RequestClass::ExtensionScheme => Strategy::NetworkOnly,
            RequestClass::ApiCall => Strategy::NetworkFirst,
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Navigable => match self.shell {
                ShellPolicy::NetworkOnly => Strategy::NetworkOnly,
                ShellPolicy::NetworkFirst => Strategy::NetworkFirst,
                ShellPolicy::CacheFirst => Strategy::CacheFirst,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selection() {
        let selector = StrategySelector::default();
        assert_eq!(selector.select(RequestClass::NonIdempotent), Strategy::NetworkOnly);
        assert_eq!(selector.select(RequestClass::ExtensionScheme), Strategy::NetworkOnly);
        assert_eq!(selector.select(RequestClass::ApiCall), Strategy::NetworkFirst);
        assert_eq!(selector.select(RequestClass::StaticAsset), Strategy::CacheFirst);
        assert_eq!(selector.select(RequestClass::Navigable), Strategy::NetworkOnly);
    }

    #[test]
    fn test_shell_policy_only_affects_navigable() {
        let selector = StrategySelector::new(ShellPolicy::CacheFirst);
        assert_eq!(selector.select(RequestClass::Navigable), Strategy::CacheFirst);
        assert_eq!(selector.select(RequestClass::ApiCall), Strategy::NetworkFirst);
        assert_eq!(selector.select(RequestClass::NonIdempotent), Strategy::NetworkOnly);
    }

    #[test]
    fn test_shell_policy_serde() {
        let policy: ShellPolicy = serde_json::from_str("\"cache_first\"").unwrap();
        assert_eq!(policy, ShellPolicy::CacheFirst);
    }
}
