// crates/ferry-relay/src/sim.rs
//
// In-memory stand-ins for the external collaborators: gauge minter (yield
// source), staking reward pool and vote-escrow locker.
//
// Each is a cheap handle over shared state so the harness can keep one clone
// to drive or inspect it while the chain owns another.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ferry_core::traits::{RewardPool, VoteEscrow, YieldSource};
use ferry_core::types::{Address, Amount, PoolId};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Yield source whose claimable revenue grows only through `accrue`.
#[derive(Debug, Clone, Default)]
pub struct MemoryYieldSource {
    claimable: Arc<Mutex<BTreeMap<PoolId, Amount>>>,
}

impl MemoryYieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accrue(&self, pool_id: PoolId, amount: Amount) {
        let mut claimable = guard(&self.claimable);
        let entry = claimable.entry(pool_id).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

impl YieldSource for MemoryYieldSource {
    fn claimable(&self, pool_id: PoolId) -> Amount {
        guard(&self.claimable).get(&pool_id).copied().unwrap_or(0)
    }

    fn claim(&mut self, pool_id: PoolId) -> Amount {
        guard(&self.claimable).remove(&pool_id).unwrap_or(0)
    }
}

/// Reward pool that totals what it has been notified of.
#[derive(Debug, Clone, Default)]
pub struct MemoryRewardPool {
    notified: Arc<Mutex<BTreeMap<PoolId, Amount>>>,
}

impl MemoryRewardPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notified(&self, pool_id: PoolId) -> Amount {
        guard(&self.notified).get(&pool_id).copied().unwrap_or(0)
    }
}

impl RewardPool for MemoryRewardPool {
    fn notify_reward_amount(&mut self, pool_id: PoolId, amount: Amount) {
        let mut notified = guard(&self.notified);
        let entry = notified.entry(pool_id).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

/// Vote-escrow locker recording locked amounts per account.
#[derive(Debug, Clone)]
pub struct MemoryVoteEscrow {
    address: Address,
    locks: Arc<Mutex<BTreeMap<Address, Amount>>>,
}

impl MemoryVoteEscrow {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            locks: Arc::default(),
        }
    }

    pub fn locked(&self, account: &Address) -> Amount {
        guard(&self.locks).get(account).copied().unwrap_or(0)
    }

    pub fn total_locked(&self) -> Amount {
        guard(&self.locks).values().sum()
    }
}

impl VoteEscrow for MemoryVoteEscrow {
    fn address(&self) -> Address {
        self.address
    }

    fn lock(&mut self, account: &Address, amount: Amount) {
        let mut locks = guard(&self.locks);
        let entry = locks.entry(*account).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yield_source_accrue_and_claim() {
        let handle = MemoryYieldSource::new();
        let mut owned = handle.clone();
        handle.accrue(0, 100);
        handle.accrue(0, 50);
        assert_eq!(owned.claimable(0), 150);
        assert_eq!(owned.claim(0), 150);
        assert_eq!(handle.claimable(0), 0);
        assert_eq!(owned.claim(1), 0);
    }

    #[test]
    fn test_reward_pool_totals() {
        let handle = MemoryRewardPool::new();
        let mut owned = handle.clone();
        owned.notify_reward_amount(3, 10);
        owned.notify_reward_amount(3, 5);
        assert_eq!(handle.notified(3), 15);
        assert_eq!(handle.notified(4), 0);
    }

    #[test]
    fn test_vote_escrow_locks() {
        let handle = MemoryVoteEscrow::new(Address::derive("locker"));
        let mut owned = handle.clone();
        let alice = Address::derive("alice");
        owned.lock(&alice, 7);
        owned.lock(&alice, 3);
        assert_eq!(handle.locked(&alice), 10);
        assert_eq!(handle.total_locked(), 10);
        assert_eq!(owned.address(), Address::derive("locker"));
    }
}
