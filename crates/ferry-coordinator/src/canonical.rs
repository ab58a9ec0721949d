// crates/ferry-coordinator/src/canonical.rs
//
// Canonical coordinator: the authoritative fee-debt ledger.
//
// Debt per satellite chain rises only on authenticated debt-increase messages
// and falls only on settlement by that chain's bridge delegate. Distribution
// mints governance token against the debt accrued since the previous
// distribution, bridges it to the satellite coordinator, and broadcasts the
// resulting emission rate.
//
// Two ledgers are kept per chain:
//   fee_debt      - revenue still owed by the satellite (settlement target)
//   undistributed - revenue not yet minted against (distribution input)
// Both rise together on a debt increase; each falls independently.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use ferry_bridge::CanonicalBridge;
use ferry_core::error::FerryError;
use ferry_core::governance::Governance;
use ferry_core::message::{Envelope, MessageId, Payload};
use ferry_core::outbox::{ensure_fee, Outbox};
use ferry_core::remote::{RemoteEndpoint, TrustedRemoteRegistry};
use ferry_core::traits::InboundOutcome;
use ferry_core::types::{Address, Amount, ChainId};
use ferry_economics::emission::{emission_rate, EmissionPolicy, SupplyCap};
use ferry_economics::token::TokenLedger;

/// Result of one `distribute_emission` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub chain_id: ChainId,
    /// Undistributed debt consumed by this distribution.
    pub debt: Amount,
    pub minted: Amount,
    /// Broadcast rate, `minted * RATE_SCALE / debt`.
    pub rate: Amount,
    /// Bridge transfer of the minted amount.
    pub transfer_id: MessageId,
    pub rate_update_id: MessageId,
}

pub struct CanonicalCoordinator {
    address: Address,
    chain_id: ChainId,
    governance: Governance,
    remotes: TrustedRemoteRegistry,
    fee_debt: BTreeMap<ChainId, Amount>,
    undistributed: BTreeMap<ChainId, Amount>,
    bridge_delegates: BTreeMap<ChainId, Address>,
    satellite_coordinators: BTreeMap<ChainId, Address>,
    emission_rates: BTreeMap<ChainId, Amount>,
    distributors: BTreeSet<Address>,
    open_settlement: bool,
    policy: Box<dyn EmissionPolicy>,
    supply_cap: SupplyCap,
}

impl fmt::Debug for CanonicalCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalCoordinator")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("fee_debt", &self.fee_debt)
            .field("undistributed", &self.undistributed)
            .field("bridge_delegates", &self.bridge_delegates)
            .field("open_settlement", &self.open_settlement)
            .field("supply_cap", &self.supply_cap)
            .finish_non_exhaustive()
    }
}

impl CanonicalCoordinator {
    /// Create a coordinator. `authority` starts as the only distributor.
    pub fn new(
        address: Address,
        chain_id: ChainId,
        authority: Address,
        policy: Box<dyn EmissionPolicy>,
        supply_cap: SupplyCap,
    ) -> Self {
        let mut distributors = BTreeSet::new();
        distributors.insert(authority);
        Self {
            address,
            chain_id,
            governance: Governance::new(authority),
            remotes: TrustedRemoteRegistry::new(),
            fee_debt: BTreeMap::new(),
            undistributed: BTreeMap::new(),
            bridge_delegates: BTreeMap::new(),
            satellite_coordinators: BTreeMap::new(),
            emission_rates: BTreeMap::new(),
            distributors,
            open_settlement: false,
            policy,
            supply_cap,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    pub fn governance_mut(&mut self) -> &mut Governance {
        &mut self.governance
    }

    pub fn remotes(&self) -> &TrustedRemoteRegistry {
        &self.remotes
    }

    /// Outstanding debt of `chain_id`; zero for chains never heard from.
    pub fn fee_debt(&self, chain_id: ChainId) -> Amount {
        self.fee_debt.get(&chain_id).copied().unwrap_or(0)
    }

    pub fn fee_debts(&self) -> &BTreeMap<ChainId, Amount> {
        &self.fee_debt
    }

    pub fn undistributed(&self, chain_id: ChainId) -> Amount {
        self.undistributed.get(&chain_id).copied().unwrap_or(0)
    }

    pub fn undistributed_debts(&self) -> &BTreeMap<ChainId, Amount> {
        &self.undistributed
    }

    pub fn bridge_delegate(&self, chain_id: ChainId) -> Option<Address> {
        self.bridge_delegates.get(&chain_id).copied()
    }

    pub fn bridge_delegates(&self) -> &BTreeMap<ChainId, Address> {
        &self.bridge_delegates
    }

    pub fn satellite_coordinator(&self, chain_id: ChainId) -> Option<Address> {
        self.satellite_coordinators.get(&chain_id).copied()
    }

    pub fn satellite_coordinators(&self) -> &BTreeMap<ChainId, Address> {
        &self.satellite_coordinators
    }

    /// Last rate broadcast to `chain_id`.
    pub fn emission_rate(&self, chain_id: ChainId) -> Amount {
        self.emission_rates.get(&chain_id).copied().unwrap_or(0)
    }

    pub fn emission_rates(&self) -> &BTreeMap<ChainId, Amount> {
        &self.emission_rates
    }

    pub fn is_distributor(&self, account: &Address) -> bool {
        self.distributors.contains(account)
    }

    pub fn open_settlement(&self) -> bool {
        self.open_settlement
    }

    pub fn supply_cap(&self) -> SupplyCap {
        self.supply_cap
    }

    // --- governance ---

    pub fn set_trusted_remote(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        endpoint: RemoteEndpoint,
    ) -> Result<(), FerryError> {
        self.remotes
            .set_trusted_remote(&self.governance, caller, chain_id, endpoint)
    }

    /// Register the one account allowed to settle `chain_id`'s debt.
    /// Takes effect for the next settlement only.
    pub fn set_bridge_delegate(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        delegate: Address,
    ) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        tracing::info!("Bridge delegate for chain {} set to {}", chain_id, delegate);
        self.bridge_delegates.insert(chain_id, delegate);
        Ok(())
    }

    /// Register the satellite coordinator that receives `chain_id`'s emission.
    pub fn set_satellite_coordinator(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        coordinator: Address,
    ) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        tracing::info!(
            "Satellite coordinator for chain {} set to {}",
            chain_id,
            coordinator
        );
        self.satellite_coordinators.insert(chain_id, coordinator);
        Ok(())
    }

    pub fn set_distributor(
        &mut self,
        caller: &Address,
        distributor: Address,
        enabled: bool,
    ) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        if enabled {
            self.distributors.insert(distributor);
        } else {
            self.distributors.remove(&distributor);
        }
        Ok(())
    }

    /// When enabled, any account may settle any chain's debt.
    pub fn set_open_settlement(&mut self, caller: &Address, open: bool) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.open_settlement = open;
        Ok(())
    }

    pub fn set_emission_policy(
        &mut self,
        caller: &Address,
        policy: Box<dyn EmissionPolicy>,
    ) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.policy = policy;
        Ok(())
    }

    pub fn set_supply_cap(&mut self, caller: &Address, cap: SupplyCap) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.supply_cap = cap;
        Ok(())
    }

    // --- transitions ---

    /// Handle a message addressed to this coordinator. Only debt increases
    /// from a registered satellite coordinator, reporting their own chain, are
    /// accepted.
    pub fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome {
        let unauthenticated = || {
            InboundOutcome::Dropped(
                FerryError::Unauthenticated {
                    chain_id: envelope.src_chain,
                }
                .to_string(),
            )
        };

        if !self
            .remotes
            .validate_inbound(envelope.src_chain, &envelope.sender_pair())
        {
            tracing::warn!(
                "Canonical coordinator dropped unauthenticated message {} from chain {} sender {}",
                envelope.id,
                envelope.src_chain,
                envelope.sender
            );
            return unauthenticated();
        }

        let (chain_id, amount) = match envelope.decode_payload() {
            Ok(Payload::DebtIncrease { chain_id, amount }) => (chain_id, amount),
            Ok(other) => {
                return InboundOutcome::Dropped(format!(
                    "canonical coordinator does not accept {} messages",
                    other.kind()
                ))
            }
            Err(e) => return InboundOutcome::Dropped(e.to_string()),
        };

        if chain_id != envelope.src_chain {
            tracing::warn!(
                "Canonical coordinator dropped debt increase for chain {} relayed from chain {}",
                chain_id,
                envelope.src_chain
            );
            return unauthenticated();
        }

        let debt = self.fee_debt(chain_id);
        let pending = self.undistributed(chain_id);
        let (Some(debt), Some(pending)) = (debt.checked_add(amount), pending.checked_add(amount))
        else {
            return InboundOutcome::Dropped(
                FerryError::Overflow(format!("fee debt of chain {}", chain_id)).to_string(),
            );
        };
        self.fee_debt.insert(chain_id, debt);
        self.undistributed.insert(chain_id, pending);
        tracing::info!("Chain {} fee debt +{} -> {}", chain_id, amount, debt);
        InboundOutcome::Applied
    }

    /// Pay down `amount` of `chain_id`'s debt with revenue token held by `caller`.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the chain's bridge delegate and
    ///   settlement is not open
    /// - `ZeroAmount` if `amount` is 0
    /// - `ExceedsDebt` if `amount` is above the outstanding debt
    /// - `InsufficientBalance` if `caller` does not hold `amount`
    pub fn settle_fee_debt(
        &mut self,
        revenue: &mut TokenLedger,
        caller: &Address,
        chain_id: ChainId,
        amount: Amount,
    ) -> Result<(), FerryError> {
        if !self.open_settlement && self.bridge_delegate(chain_id) != Some(*caller) {
            return Err(FerryError::Unauthorized(format!(
                "{} is not the bridge delegate of chain {}",
                caller, chain_id
            )));
        }
        if amount == 0 {
            return Err(FerryError::ZeroAmount("settle fee debt".to_string()));
        }
        let debt = self.fee_debt(chain_id);
        if amount > debt {
            return Err(FerryError::ExceedsDebt {
                chain_id,
                amount,
                debt,
            });
        }
        revenue.ensure_balance(caller, amount)?;

        revenue.transfer(caller, &self.address, amount)?;
        self.fee_debt.insert(chain_id, debt - amount);
        tracing::info!(
            "Chain {} settled {} (debt {} -> {})",
            chain_id,
            revenue.display(amount),
            debt,
            debt - amount
        );
        Ok(())
    }

    /// Mint governance token against `chain_id`'s undistributed debt, bridge it
    /// to the satellite coordinator and broadcast the new emission rate.
    ///
    /// `native_fee` must cover both outbound messages.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not a distributor
    /// - `UnknownChain` if no satellite coordinator is registered
    /// - `UntrustedDestination` if either trusted remote is missing
    /// - `ZeroAmount` if nothing accrued since the last distribution, or the
    ///   policy mints nothing for it
    /// - `InflationCeilingExceeded` if the mint would pass the supply cap
    /// - `InsufficientMessageFee` if `native_fee` is below the combined quote
    pub fn distribute_emission(
        &mut self,
        token: &mut TokenLedger,
        bridge: &CanonicalBridge,
        outbox: &mut Outbox,
        caller: &Address,
        chain_id: ChainId,
        native_fee: Amount,
    ) -> Result<Distribution, FerryError> {
        if !self.is_distributor(caller) {
            return Err(FerryError::Unauthorized(format!(
                "{} is not a distributor",
                caller
            )));
        }
        let recipient = self
            .satellite_coordinator(chain_id)
            .ok_or(FerryError::UnknownChain(chain_id))?;
        let endpoint = *self.remotes.require(chain_id)?;
        bridge.remotes().require(chain_id)?;

        let debt = self.undistributed(chain_id);
        if debt == 0 {
            return Err(FerryError::ZeroAmount(format!(
                "no undistributed debt for chain {}",
                chain_id
            )));
        }

        let supply = token.total_supply();
        let minted = self.policy.compute_emission(chain_id, debt, supply);
        if minted == 0 {
            // Debt stays undistributed and the satellite keeps its current rate.
            return Err(FerryError::ZeroAmount(format!(
                "debt {} of chain {} mints nothing",
                debt, chain_id
            )));
        }
        self.supply_cap.check(supply, minted)?;
        let rate = emission_rate(minted, debt);

        let rate_payload = Payload::RateUpdate { rate };
        let transfer_fee = bridge.quote_send(outbox, recipient, minted);
        let rate_fee = outbox.quote(&rate_payload);
        ensure_fee(native_fee, transfer_fee.saturating_add(rate_fee))?;

        token.mint(&self.address, minted)?;
        let transfer_id = bridge.send(
            token,
            outbox,
            &self.address,
            chain_id,
            recipient,
            minted,
            transfer_fee,
        )?;
        let rate_update_id = outbox.enqueue(chain_id, &endpoint, &rate_payload, rate_fee)?;

        self.undistributed.insert(chain_id, 0);
        self.emission_rates.insert(chain_id, rate);
        tracing::info!(
            "Distributed {} to chain {} against debt {} (rate {})",
            token.display(minted),
            chain_id,
            debt,
            rate
        );

        Ok(Distribution {
            chain_id,
            debt,
            minted,
            rate,
            transfer_id,
            rate_update_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::outbox::FeeSchedule;
    use ferry_economics::emission::{LinearEmission, RATE_SCALE};

    const L1: ChainId = 101;
    const L2: ChainId = 110;
    const L3: ChainId = 111;

    fn dao() -> Address {
        Address::derive("dao")
    }

    fn delegate() -> Address {
        Address::derive("delegate")
    }

    fn sat_coordinator(chain: ChainId) -> Address {
        Address::derive(&format!("{}/coordinator", chain))
    }

    fn sat_bridge(chain: ChainId) -> Address {
        Address::derive(&format!("{}/bridge", chain))
    }

    struct Fixture {
        coord: CanonicalCoordinator,
        bridge: CanonicalBridge,
        token: TokenLedger,
        revenue: TokenLedger,
        outbox: Outbox,
    }

    fn setup() -> Fixture {
        let mut coord = CanonicalCoordinator::new(
            Address::derive("l1/coordinator"),
            L1,
            dao(),
            Box::new(LinearEmission::new(1, 2)),
            SupplyCap::new(1_000_000),
        );
        let mut bridge = CanonicalBridge::new(Address::derive("l1/bridge"), L1, dao());
        for chain in [L2, L3] {
            let endpoint = RemoteEndpoint {
                remote: sat_coordinator(chain),
                local: coord.address(),
            };
            coord.set_trusted_remote(&dao(), chain, endpoint).unwrap();
            coord
                .set_satellite_coordinator(&dao(), chain, sat_coordinator(chain))
                .unwrap();
            let endpoint = RemoteEndpoint {
                remote: sat_bridge(chain),
                local: bridge.address(),
            };
            bridge.set_trusted_remote(&dao(), chain, endpoint).unwrap();
        }
        coord.set_bridge_delegate(&dao(), L2, delegate()).unwrap();
        Fixture {
            coord,
            bridge,
            token: TokenLedger::new("AURA"),
            revenue: TokenLedger::new("CRV"),
            outbox: Outbox::new(L1, FeeSchedule::default()),
        }
    }

    fn debt_increase(coord: &CanonicalCoordinator, src: ChainId, chain_id: ChainId, amount: Amount) -> Envelope {
        Envelope::new(
            src,
            L1,
            0,
            sat_coordinator(src),
            coord.address(),
            Payload::DebtIncrease { chain_id, amount }.encode(),
        )
    }

    #[test]
    fn test_debt_increase_accrues() {
        let mut f = setup();
        assert_eq!(f.coord.fee_debt(L2), 0);
        assert!(f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 600)).is_applied());
        assert!(f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 400)).is_applied());
        assert_eq!(f.coord.fee_debt(L2), 1_000);
        assert_eq!(f.coord.undistributed(L2), 1_000);
        assert_eq!(f.coord.fee_debt(L3), 0);
    }

    #[test]
    fn test_debt_increase_for_other_chain_is_dropped() {
        let mut f = setup();
        let env = debt_increase(&f.coord, L2, L3, 500);
        assert!(!f.coord.handle_inbound(&env).is_applied());
        assert_eq!(f.coord.fee_debt(L3), 0);
        assert_eq!(f.coord.fee_debt(L2), 0);
    }

    #[test]
    fn test_forged_debt_increase_is_dropped() {
        let mut f = setup();
        let env = Envelope::new(
            L2,
            L1,
            0,
            Address::derive("mallory"),
            f.coord.address(),
            Payload::DebtIncrease { chain_id: L2, amount: 1 }.encode(),
        );
        assert!(!f.coord.handle_inbound(&env).is_applied());
        assert!(f.coord.fee_debts().is_empty());
    }

    #[test]
    fn test_settlement_scenario() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        f.revenue.mint(&delegate(), 20_000).unwrap();

        f.coord
            .settle_fee_debt(&mut f.revenue, &delegate(), L2, 4_000)
            .unwrap();
        assert_eq!(f.coord.fee_debt(L2), 6_000);
        assert_eq!(f.revenue.balance_of(&f.coord.address()), 4_000);

        let err = f
            .coord
            .settle_fee_debt(&mut f.revenue, &delegate(), L2, 7_000)
            .unwrap_err();
        assert_eq!(
            err,
            FerryError::ExceedsDebt { chain_id: L2, amount: 7_000, debt: 6_000 }
        );
        assert_eq!(f.coord.fee_debt(L2), 6_000);
        assert_eq!(f.revenue.balance_of(&delegate()), 16_000);
    }

    #[test]
    fn test_settlement_requires_delegate() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 100));
        let bob = Address::derive("bob");
        f.revenue.mint(&bob, 100).unwrap();

        let result = f.coord.settle_fee_debt(&mut f.revenue, &bob, L2, 50);
        assert!(matches!(result, Err(FerryError::Unauthorized(_))));

        f.coord.set_open_settlement(&dao(), true).unwrap();
        f.coord.settle_fee_debt(&mut f.revenue, &bob, L2, 50).unwrap();
        assert_eq!(f.coord.fee_debt(L2), 50);
    }

    #[test]
    fn test_settlement_before_debt_under_settles() {
        let mut f = setup();
        f.revenue.mint(&delegate(), 100).unwrap();
        let result = f.coord.settle_fee_debt(&mut f.revenue, &delegate(), L2, 1);
        assert!(matches!(result, Err(FerryError::ExceedsDebt { debt: 0, .. })));
    }

    #[test]
    fn test_delegate_rotation_not_retroactive() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 100));
        f.revenue.mint(&delegate(), 100).unwrap();
        f.coord.settle_fee_debt(&mut f.revenue, &delegate(), L2, 40).unwrap();

        let next = Address::derive("next-delegate");
        f.coord.set_bridge_delegate(&dao(), L2, next).unwrap();
        assert!(f.coord.settle_fee_debt(&mut f.revenue, &delegate(), L2, 10).is_err());
        assert_eq!(f.coord.fee_debt(L2), 60);
    }

    #[test]
    fn test_distribute_emission() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));

        let dist = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0)
            .unwrap();
        assert_eq!(dist.debt, 10_000);
        assert_eq!(dist.minted, 5_000);
        assert_eq!(dist.rate, RATE_SCALE / 2);
        assert_eq!(dist.transfer_id, f.outbox.pending().next().unwrap().id);

        assert_eq!(f.token.total_supply(), 5_000);
        assert_eq!(f.bridge.custody(&f.token), 5_000);
        assert_eq!(f.coord.undistributed(L2), 0);
        assert_eq!(f.coord.fee_debt(L2), 10_000);
        assert_eq!(f.coord.emission_rate(L2), RATE_SCALE / 2);

        let sent = f.outbox.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].receiver, sat_bridge(L2));
        assert_eq!(
            sent[0].decode_payload().unwrap(),
            Payload::TokenTransfer { to: sat_coordinator(L2), amount: 5_000 }
        );
        assert_eq!(sent[1].receiver, sat_coordinator(L2));
        assert_eq!(sent[1].decode_payload().unwrap(), Payload::RateUpdate { rate: RATE_SCALE / 2 });
    }

    #[test]
    fn test_distribute_twice_without_new_debt_fails() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        f.coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0)
            .unwrap();
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0);
        assert!(matches!(result, Err(FerryError::ZeroAmount(_))));
        assert_eq!(f.token.total_supply(), 5_000);
    }

    #[test]
    fn test_distribute_that_mints_nothing_keeps_rate_and_debt() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        f.coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0)
            .unwrap();
        f.outbox.drain();

        // Half of 1 rounds down to nothing.
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 1));
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0);
        assert!(matches!(result, Err(FerryError::ZeroAmount(_))));
        assert_eq!(f.coord.undistributed(L2), 1);
        assert_eq!(f.coord.emission_rate(L2), RATE_SCALE / 2);
        assert_eq!(f.token.total_supply(), 5_000);
        assert_eq!(f.outbox.pending_len(), 0);

        // Once enough accrues the whole backlog is minted against.
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 1));
        let dist = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0)
            .unwrap();
        assert_eq!(dist.debt, 2);
        assert_eq!(dist.minted, 1);
        assert_eq!(f.coord.undistributed(L2), 0);
    }

    #[test]
    fn test_distribute_requires_distributor() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        let keeper = Address::derive("keeper");
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &keeper, L2, 0);
        assert!(matches!(result, Err(FerryError::Unauthorized(_))));

        f.coord.set_distributor(&dao(), keeper, true).unwrap();
        assert!(f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &keeper, L2, 0)
            .is_ok());
    }

    #[test]
    fn test_distribute_respects_supply_cap() {
        let mut f = setup();
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        f.coord.set_supply_cap(&dao(), SupplyCap::new(4_999)).unwrap();
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 0);
        assert!(matches!(result, Err(FerryError::InflationCeilingExceeded { .. })));
        assert_eq!(f.token.total_supply(), 0);
        assert_eq!(f.coord.undistributed(L2), 10_000);
        assert_eq!(f.outbox.pending_len(), 0);
    }

    #[test]
    fn test_distribute_fee_shortfall_changes_nothing() {
        let mut f = setup();
        f.outbox = Outbox::new(L1, FeeSchedule { base_fee: 10, per_byte_fee: 0 });
        f.coord.handle_inbound(&debt_increase(&f.coord, L2, L2, 10_000));
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 19);
        assert!(matches!(
            result,
            Err(FerryError::InsufficientMessageFee { attached: 19, required: 20 })
        ));
        assert_eq!(f.token.total_supply(), 0);
        assert_eq!(f.coord.undistributed(L2), 10_000);

        assert!(f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), L2, 20)
            .is_ok());
    }

    #[test]
    fn test_distribute_unknown_chain() {
        let mut f = setup();
        let result = f
            .coord
            .distribute_emission(&mut f.token, &f.bridge, &mut f.outbox, &dao(), 42, 0);
        assert!(matches!(result, Err(FerryError::UnknownChain(42))));
    }

    #[test]
    fn test_governance_setters_require_authority() {
        let mut f = setup();
        let bob = Address::derive("bob");
        assert!(f.coord.set_bridge_delegate(&bob, L2, bob).is_err());
        assert!(f.coord.set_satellite_coordinator(&bob, L2, bob).is_err());
        assert!(f.coord.set_distributor(&bob, bob, true).is_err());
        assert!(f.coord.set_open_settlement(&bob, true).is_err());
        assert_eq!(f.coord.bridge_delegate(L2), Some(delegate()));
    }
}
