use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a strategy in the registry.
///
/// Assigned once by `add_strategy` and never reused: the registry is
/// append-only, so an index names the same adapter for the life of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyIndex(pub usize);

impl StrategyIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl From<usize> for StrategyIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for StrategyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a claim holder (depositor, recipient, or pool owner).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HolderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HolderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_index_displays_with_hash_prefix() {
        assert_eq!(StrategyIndex(3).to_string(), "#3");
    }

    #[test]
    fn holder_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&HolderId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn strategy_indices_order_by_position() {
        let mut v = vec![StrategyIndex(2), StrategyIndex(0), StrategyIndex(1)];
        v.sort();
        assert_eq!(v, vec![StrategyIndex(0), StrategyIndex(1), StrategyIndex(2)]);
    }
}
