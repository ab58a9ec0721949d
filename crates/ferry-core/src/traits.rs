// crates/ferry-core/src/traits.rs

use crate::message::Envelope;
use crate::outbox::Outbox;
use crate::types::{Address, Amount, ChainId, PoolId};

/// Result of handing an inbound envelope to a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The message was authenticated and its effect applied.
    Applied,
    /// The message was dropped with no state change.
    Dropped(String),
}

impl InboundOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, InboundOutcome::Applied)
    }
}

/// A chain as seen by the relay: something with an outbox that accepts envelopes.
///
/// Implemented by the canonical and satellite chain aggregates in
/// ferry-coordinator.
pub trait InboundHandler: Send {
    fn chain_id(&self) -> ChainId;

    /// Deliver one envelope. Never fails: unauthenticated or malformed
    /// messages come back as `Dropped`.
    fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome;

    fn outbox_mut(&mut self) -> &mut Outbox;
}

/// Underlying revenue source for satellite reward pools (gauge minter).
pub trait YieldSource: Send {
    /// Revenue currently claimable for `pool_id`.
    fn claimable(&self, pool_id: PoolId) -> Amount;

    /// Claim everything claimable for `pool_id`, returning the amount realized.
    fn claim(&mut self, pool_id: PoolId) -> Amount;
}

/// Staking reward pool that streams revenue to depositors.
pub trait RewardPool: Send {
    /// Called after `amount` of revenue has been transferred to the pool's contract.
    fn notify_reward_amount(&mut self, pool_id: PoolId, amount: Amount);
}

/// Vote-escrow locker on the canonical chain.
pub trait VoteEscrow: Send {
    /// Address the locked governance token is transferred to.
    fn address(&self) -> Address;

    /// Record a lock of `amount` on behalf of `account`.
    fn lock(&mut self, account: &Address, amount: Amount);
}
