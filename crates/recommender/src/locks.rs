//! Per-investor async locks serializing read-modify-write of bandit state.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct InvestorLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl InvestorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one investor's state. Different investors
    /// never contend.
    pub async fn acquire(&self, investor_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(investor_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_investor_is_exclusive() {
        let locks = InvestorLocks::new();
        let guard = locks.acquire("inv-1").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire("inv-1")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(20), locks.acquire("inv-1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_investors_do_not_contend() {
        let locks = InvestorLocks::new();
        let _a = locks.acquire("inv-1").await;
        let b = tokio::time::timeout(Duration::from_millis(20), locks.acquire("inv-2")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
