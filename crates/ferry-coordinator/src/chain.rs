// crates/ferry-coordinator/src/chain.rs
//
// Per-chain aggregates.
//
// A chain is one owned value: its token ledgers, its contracts and its outbox.
// Every transition takes `&mut self`, so a chain never observes concurrent
// mutation. The relay delivers into a chain through `InboundHandler`, which
// routes by receiving contract address.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferry_bridge::{CanonicalBridge, SatelliteBridge};
use ferry_core::error::FerryError;
use ferry_core::message::{Envelope, MessageId};
use ferry_core::outbox::{FeeSchedule, Outbox};
use ferry_core::remote::RemoteEndpoint;
use ferry_core::traits::{InboundHandler, InboundOutcome, RewardPool, VoteEscrow, YieldSource};
use ferry_core::types::{Address, Amount, ChainId, PoolId};
use ferry_economics::emission::{EmissionPolicy, SupplyCap};
use ferry_economics::fees::FeeSplitParameters;
use ferry_economics::token::TokenLedger;

use crate::canonical::{CanonicalCoordinator, Distribution};
use crate::satellite::SatelliteCoordinator;
use crate::splitter::{EarmarkContext, EarmarkReceipt, FeeSplitter};

/// Deterministic address of contract `name` on `chain_id`.
pub fn contract_address(chain_id: ChainId, name: &str) -> Address {
    Address::derive(&format!("ferry/{}/{}", chain_id, name))
}

/// Symbols used by the simulated ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSymbols {
    pub governance: String,
    pub revenue: String,
}

impl Default for TokenSymbols {
    fn default() -> Self {
        Self {
            governance: "AURA".to_string(),
            revenue: "CRV".to_string(),
        }
    }
}

fn route_unknown(chain_id: ChainId, envelope: &Envelope) -> InboundOutcome {
    tracing::warn!(
        "Chain {} has no contract at {} (message {})",
        chain_id,
        envelope.receiver,
        envelope.id
    );
    InboundOutcome::Dropped(format!("no contract at {}", envelope.receiver))
}

// ---------------------------------------------------------------------------
// Canonical chain
// ---------------------------------------------------------------------------

pub struct CanonicalChain {
    pub chain_id: ChainId,
    /// Governance token.
    pub token: TokenLedger,
    /// Revenue token as held on the canonical chain.
    pub revenue: TokenLedger,
    pub bridge: CanonicalBridge,
    pub coordinator: CanonicalCoordinator,
    pub outbox: Outbox,
    pub vote_escrow: Box<dyn VoteEscrow>,
}

impl CanonicalChain {
    pub fn new(
        chain_id: ChainId,
        authority: Address,
        symbols: &TokenSymbols,
        policy: Box<dyn EmissionPolicy>,
        supply_cap: SupplyCap,
        fee_schedule: FeeSchedule,
        vote_escrow: Box<dyn VoteEscrow>,
    ) -> Self {
        Self {
            chain_id,
            token: TokenLedger::new(symbols.governance.as_str()),
            revenue: TokenLedger::new(symbols.revenue.as_str()),
            bridge: CanonicalBridge::new(contract_address(chain_id, "bridge"), chain_id, authority),
            coordinator: CanonicalCoordinator::new(
                contract_address(chain_id, "coordinator"),
                chain_id,
                authority,
                policy,
                supply_cap,
            ),
            outbox: Outbox::new(chain_id, fee_schedule),
            vote_escrow,
        }
    }

    /// See [`CanonicalCoordinator::distribute_emission`].
    pub fn distribute_emission(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        native_fee: Amount,
    ) -> Result<Distribution, FerryError> {
        self.coordinator.distribute_emission(
            &mut self.token,
            &self.bridge,
            &mut self.outbox,
            caller,
            chain_id,
            native_fee,
        )
    }

    /// See [`CanonicalCoordinator::settle_fee_debt`].
    pub fn settle_fee_debt(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        amount: Amount,
    ) -> Result<(), FerryError> {
        self.coordinator
            .settle_fee_debt(&mut self.revenue, caller, chain_id, amount)
    }

    /// Bridge governance token from `from` to `to` on `dst`.
    pub fn bridge_send(
        &mut self,
        from: &Address,
        dst: ChainId,
        to: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        self.bridge
            .send(&mut self.token, &mut self.outbox, from, dst, to, amount, fee)
    }

    /// Lock `account`'s governance token into vote escrow.
    pub fn lock(&mut self, account: &Address, amount: Amount) -> Result<(), FerryError> {
        self.bridge
            .lock(&mut self.token, self.vote_escrow.as_mut(), account, amount)
    }

    pub fn bridged_supply(&self) -> Amount {
        self.bridge.custody(&self.token)
    }

    pub fn snapshot(&self) -> CanonicalSnapshot {
        CanonicalSnapshot {
            chain_id: self.chain_id,
            taken_at: Utc::now(),
            authority: self.coordinator.governance().authority(),
            token_supply: self.token.total_supply(),
            bridged_supply: self.bridged_supply(),
            settled_revenue: self.revenue.balance_of(&self.coordinator.address()),
            coordinator_remotes: self.coordinator.remotes().entries().clone(),
            bridge_remotes: self.bridge.remotes().entries().clone(),
            fee_debt: self.coordinator.fee_debts().clone(),
            undistributed: self.coordinator.undistributed_debts().clone(),
            bridge_delegates: self.coordinator.bridge_delegates().clone(),
            satellite_coordinators: self.coordinator.satellite_coordinators().clone(),
            emission_rates: self.coordinator.emission_rates().clone(),
            open_settlement: self.coordinator.open_settlement(),
        }
    }
}

impl InboundHandler for CanonicalChain {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome {
        if envelope.receiver == self.bridge.address() {
            self.bridge
                .handle_inbound(&mut self.token, self.vote_escrow.as_mut(), envelope)
        } else if envelope.receiver == self.coordinator.address() {
            self.coordinator.handle_inbound(envelope)
        } else {
            route_unknown(self.chain_id, envelope)
        }
    }

    fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }
}

/// Serializable view of the canonical chain's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSnapshot {
    pub chain_id: ChainId,
    pub taken_at: DateTime<Utc>,
    pub authority: Address,
    pub token_supply: Amount,
    pub bridged_supply: Amount,
    pub settled_revenue: Amount,
    pub coordinator_remotes: BTreeMap<ChainId, RemoteEndpoint>,
    pub bridge_remotes: BTreeMap<ChainId, RemoteEndpoint>,
    pub fee_debt: BTreeMap<ChainId, Amount>,
    pub undistributed: BTreeMap<ChainId, Amount>,
    pub bridge_delegates: BTreeMap<ChainId, Address>,
    pub satellite_coordinators: BTreeMap<ChainId, Address>,
    pub emission_rates: BTreeMap<ChainId, Amount>,
    pub open_settlement: bool,
}

// ---------------------------------------------------------------------------
// Satellite chain
// ---------------------------------------------------------------------------

pub struct SatelliteChain {
    pub chain_id: ChainId,
    pub canonical_chain_id: ChainId,
    /// Revenue token as realized on this chain.
    pub revenue: TokenLedger,
    pub bridge: SatelliteBridge,
    pub coordinator: SatelliteCoordinator,
    pub splitter: FeeSplitter,
    pub outbox: Outbox,
    pub yield_source: Box<dyn YieldSource>,
    pub reward_pool: Box<dyn RewardPool>,
}

impl SatelliteChain {
    pub fn new(
        chain_id: ChainId,
        canonical_chain_id: ChainId,
        authority: Address,
        symbols: &TokenSymbols,
        fee_schedule: FeeSchedule,
        yield_source: Box<dyn YieldSource>,
        reward_pool: Box<dyn RewardPool>,
    ) -> Self {
        let splitter = FeeSplitter::new(contract_address(chain_id, "splitter"), chain_id, authority);
        Self {
            chain_id,
            canonical_chain_id,
            revenue: TokenLedger::new(symbols.revenue.as_str()),
            bridge: SatelliteBridge::new(
                contract_address(chain_id, "bridge"),
                chain_id,
                canonical_chain_id,
                authority,
                &symbols.governance,
            ),
            coordinator: SatelliteCoordinator::new(
                contract_address(chain_id, "coordinator"),
                chain_id,
                canonical_chain_id,
                authority,
                splitter.address(),
            ),
            splitter,
            outbox: Outbox::new(chain_id, fee_schedule),
            yield_source,
            reward_pool,
        }
    }

    /// See [`FeeSplitter::earmark_rewards`].
    pub fn earmark_rewards(
        &mut self,
        caller: &Address,
        pool_id: PoolId,
        native_fee: Amount,
    ) -> Result<EarmarkReceipt, FerryError> {
        let ctx = EarmarkContext {
            revenue: &mut self.revenue,
            coordinator: &self.coordinator,
            outbox: &mut self.outbox,
            yield_source: self.yield_source.as_mut(),
            reward_pool: self.reward_pool.as_mut(),
        };
        self.splitter.earmark_rewards(ctx, caller, pool_id, native_fee)
    }

    /// See [`FeeSplitter::reward_claimed`].
    pub fn reward_claimed(
        &mut self,
        caller: &Address,
        pool_id: PoolId,
        to: &Address,
        amount: Amount,
    ) -> Result<Amount, FerryError> {
        self.splitter.reward_claimed(
            &self.coordinator,
            self.bridge.wrapped_mut(),
            caller,
            pool_id,
            to,
            amount,
        )
    }

    /// See [`SatelliteCoordinator::settle_to_canonical`].
    pub fn settle_to_canonical(&mut self, caller: &Address, amount: Amount) -> Result<(), FerryError> {
        self.coordinator
            .settle_to_canonical(&mut self.revenue, caller, amount)
    }

    pub fn bridge_send(
        &mut self,
        from: &Address,
        dst: ChainId,
        to: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        self.bridge.send(&mut self.outbox, from, dst, to, amount, fee)
    }

    /// Burn wrapped token and lock the same amount on the canonical chain.
    pub fn lock(&mut self, account: &Address, amount: Amount, fee: Amount) -> Result<MessageId, FerryError> {
        self.bridge.lock(&mut self.outbox, account, amount, fee)
    }

    pub fn wrapped_supply(&self) -> Amount {
        self.bridge.wrapped().total_supply()
    }

    pub fn custody(&self) -> Amount {
        self.coordinator.custody(&self.revenue)
    }

    pub fn snapshot(&self) -> SatelliteSnapshot {
        SatelliteSnapshot {
            chain_id: self.chain_id,
            taken_at: Utc::now(),
            authority: self.coordinator.governance().authority(),
            emission_rate: self.coordinator.emission_rate(),
            custody: self.custody(),
            wrapped_supply: self.wrapped_supply(),
            coordinator_wrapped: self.bridge.wrapped().balance_of(&self.coordinator.address()),
            bridge_delegate: self.coordinator.bridge_delegate(),
            fee_params: self.splitter.params(),
            treasury: self.splitter.treasury(),
            coordinator_remotes: self.coordinator.remotes().entries().clone(),
            bridge_remotes: self.bridge.remotes().entries().clone(),
            shutdown: self.splitter.is_shutdown(),
        }
    }
}

impl InboundHandler for SatelliteChain {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome {
        if envelope.receiver == self.bridge.address() {
            self.bridge.handle_inbound(envelope)
        } else if envelope.receiver == self.coordinator.address() {
            self.coordinator.handle_inbound(envelope)
        } else {
            route_unknown(self.chain_id, envelope)
        }
    }

    fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }
}

/// Serializable view of a satellite chain's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteSnapshot {
    pub chain_id: ChainId,
    pub taken_at: DateTime<Utc>,
    pub authority: Address,
    pub emission_rate: Amount,
    pub custody: Amount,
    pub wrapped_supply: Amount,
    pub coordinator_wrapped: Amount,
    pub bridge_delegate: Option<Address>,
    pub fee_params: FeeSplitParameters,
    pub treasury: Option<Address>,
    pub coordinator_remotes: BTreeMap<ChainId, RemoteEndpoint>,
    pub bridge_remotes: BTreeMap<ChainId, RemoteEndpoint>,
    pub shutdown: bool,
}

/// Snapshot of every chain in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub canonical: CanonicalSnapshot,
    pub satellites: Vec<SatelliteSnapshot>,
}

impl NetworkSnapshot {
    pub fn to_json(&self) -> Result<String, FerryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::message::Payload;
    use ferry_economics::emission::LinearEmission;

    const L1: ChainId = 101;
    const L2: ChainId = 110;

    struct NoYield;

    impl YieldSource for NoYield {
        fn claimable(&self, _pool_id: PoolId) -> Amount {
            0
        }

        fn claim(&mut self, _pool_id: PoolId) -> Amount {
            0
        }
    }

    struct NoPool;

    impl RewardPool for NoPool {
        fn notify_reward_amount(&mut self, _pool_id: PoolId, _amount: Amount) {}
    }

    struct NoEscrow;

    impl VoteEscrow for NoEscrow {
        fn address(&self) -> Address {
            Address::derive("escrow")
        }

        fn lock(&mut self, _account: &Address, _amount: Amount) {}
    }

    fn dao() -> Address {
        Address::derive("dao")
    }

    fn canonical() -> CanonicalChain {
        CanonicalChain::new(
            L1,
            dao(),
            &TokenSymbols::default(),
            Box::new(LinearEmission::new(1, 1)),
            SupplyCap::new(Amount::MAX),
            FeeSchedule::default(),
            Box::new(NoEscrow),
        )
    }

    fn satellite() -> SatelliteChain {
        SatelliteChain::new(
            L2,
            L1,
            dao(),
            &TokenSymbols::default(),
            FeeSchedule::default(),
            Box::new(NoYield),
            Box::new(NoPool),
        )
    }

    #[test]
    fn test_contract_addresses_are_distinct() {
        assert_ne!(contract_address(L1, "bridge"), contract_address(L2, "bridge"));
        assert_ne!(contract_address(L1, "bridge"), contract_address(L1, "coordinator"));
        assert_eq!(contract_address(L1, "bridge"), contract_address(L1, "bridge"));
    }

    #[test]
    fn test_satellite_wires_splitter_into_coordinator() {
        let sat = satellite();
        assert_eq!(sat.coordinator.splitter(), sat.splitter.address());
        assert_eq!(sat.snapshot().fee_params, FeeSplitParameters::default());
    }

    #[test]
    fn test_unknown_receiver_is_dropped() {
        let mut l1 = canonical();
        let env = Envelope::new(
            L2,
            L1,
            0,
            Address::derive("anyone"),
            Address::derive("nobody"),
            Payload::RateUpdate { rate: 1 }.encode(),
        );
        assert!(!l1.handle_inbound(&env).is_applied());
    }

    #[test]
    fn test_inbound_routes_by_receiver() {
        let mut l1 = canonical();
        let sat = satellite();
        l1.coordinator
            .set_trusted_remote(
                &dao(),
                L2,
                RemoteEndpoint {
                    remote: sat.coordinator.address(),
                    local: l1.coordinator.address(),
                },
            )
            .unwrap();
        let env = Envelope::new(
            L2,
            L1,
            0,
            sat.coordinator.address(),
            l1.coordinator.address(),
            Payload::DebtIncrease { chain_id: L2, amount: 77 }.encode(),
        );
        assert!(l1.handle_inbound(&env).is_applied());
        assert_eq!(l1.coordinator.fee_debt(L2), 77);
    }

    #[test]
    fn test_snapshot_serializes() {
        let l1 = canonical();
        let sat = satellite();
        let snapshot = NetworkSnapshot {
            canonical: l1.snapshot(),
            satellites: vec![sat.snapshot()],
        };
        let json = snapshot.to_json().unwrap();
        let parsed: NetworkSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert!(json.contains("\"emission_rate\""));
    }
}
