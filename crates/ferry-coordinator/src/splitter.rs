// crates/ferry-coordinator/src/splitter.rs
//
// Revenue fee splitter: the satellite-side reward collection entry point.
//
// `earmark_rewards` is permissionless. It claims a pool's revenue from the
// yield source and splits it four ways:
//
//   caller    -> whoever triggered the earmark
//   platform  -> treasury, if one is set
//   bridge    -> satellite coordinator custody, reported to the canonical chain
//   pool      -> the pool's reward contract, then notify_reward_amount
//
// Every check runs before the claim, so a rejected earmark leaves the yield
// source, the ledgers and the outbox untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::governance::Governance;
use ferry_core::message::MessageId;
use ferry_core::outbox::{ensure_fee, Outbox};
use ferry_core::traits::{RewardPool, YieldSource};
use ferry_core::types::{Address, Amount, ChainId, PoolId};
use ferry_economics::fees::{FeeSplit, FeeSplitParameters};
use ferry_economics::token::TokenLedger;

use crate::satellite::SatelliteCoordinator;

/// A registered staking pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Contract receiving the pool share and reporting user claims.
    pub reward_contract: Address,
    pub shutdown: bool,
}

/// Collaborators an earmark touches, borrowed from the owning chain.
pub struct EarmarkContext<'a> {
    pub revenue: &'a mut TokenLedger,
    pub coordinator: &'a SatelliteCoordinator,
    pub outbox: &'a mut Outbox,
    pub yield_source: &'a mut dyn YieldSource,
    pub reward_pool: &'a mut dyn RewardPool,
}

/// What one earmark did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarmarkReceipt {
    pub pool_id: PoolId,
    pub revenue: Amount,
    pub split: FeeSplit,
    /// Debt-increase message; `None` when the bridge share rounded to zero.
    pub debt_message: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplitter {
    address: Address,
    chain_id: ChainId,
    governance: Governance,
    fee_manager: Address,
    params: FeeSplitParameters,
    treasury: Option<Address>,
    pools: BTreeMap<PoolId, PoolInfo>,
    is_shutdown: bool,
}

impl FeeSplitter {
    /// New splitter with default fees; `authority` is also the first fee manager.
    pub fn new(address: Address, chain_id: ChainId, authority: Address) -> Self {
        Self {
            address,
            chain_id,
            governance: Governance::new(authority),
            fee_manager: authority,
            params: FeeSplitParameters::default(),
            treasury: None,
            pools: BTreeMap::new(),
            is_shutdown: false,
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

    pub fn fee_manager(&self) -> Address {
        self.fee_manager
    }

    pub fn params(&self) -> FeeSplitParameters {
        self.params
    }

    pub fn treasury(&self) -> Option<Address> {
        self.treasury
    }

    pub fn pool(&self, pool_id: PoolId) -> Option<&PoolInfo> {
        self.pools.get(&pool_id)
    }

    pub fn pools(&self) -> &BTreeMap<PoolId, PoolInfo> {
        &self.pools
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    /// Replace the fee fractions. Fee manager only.
    ///
    /// # Errors
    /// `Unauthorized` for any other caller; `BoundsViolation` if `params` fails
    /// validation, in which case the previous parameters stay in force.
    pub fn set_fees(&mut self, caller: &Address, params: FeeSplitParameters) -> Result<(), FerryError> {
        if *caller != self.fee_manager {
            return Err(FerryError::Unauthorized(format!(
                "{} is not the fee manager",
                caller
            )));
        }
        params.validate()?;
        tracing::info!(
            "Chain {} fees set: lock {} staker {} caller {} platform {}",
            self.chain_id,
            params.lock_bps,
            params.staker_bps,
            params.caller_bps,
            params.platform_bps
        );
        self.params = params;
        Ok(())
    }

    pub fn set_fee_manager(&mut self, caller: &Address, manager: Address) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.fee_manager = manager;
        Ok(())
    }

    /// Set or clear the platform treasury. With no treasury the platform share
    /// stays in the pool.
    pub fn set_treasury(&mut self, caller: &Address, treasury: Option<Address>) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.treasury = treasury.filter(|t| !t.is_zero());
        Ok(())
    }

    /// Register a pool and return its id.
    pub fn add_pool(&mut self, caller: &Address, reward_contract: Address) -> Result<PoolId, FerryError> {
        self.governance.ensure_authority(caller)?;
        if self.is_shutdown {
            return Err(FerryError::Shutdown("system is shut down".to_string()));
        }
        if self.pools.values().any(|p| p.reward_contract == reward_contract) {
            return Err(FerryError::DuplicatePool(reward_contract));
        }
        let pool_id = self
            .pools
            .keys()
            .next_back()
            .map(|last| last + 1)
            .unwrap_or(0);
        self.pools.insert(
            pool_id,
            PoolInfo {
                reward_contract,
                shutdown: false,
            },
        );
        tracing::info!("Chain {} added pool {} -> {}", self.chain_id, pool_id, reward_contract);
        Ok(pool_id)
    }

    pub fn shutdown_pool(&mut self, caller: &Address, pool_id: PoolId) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(FerryError::UnknownPool(pool_id))?;
        pool.shutdown = true;
        tracing::info!("Chain {} pool {} shut down", self.chain_id, pool_id);
        Ok(())
    }

    /// Stop all earmarking. Irreversible.
    pub fn shutdown_system(&mut self, caller: &Address) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.is_shutdown = true;
        tracing::warn!("Chain {} fee splitter shut down", self.chain_id);
        Ok(())
    }

    fn active_pool(&self, pool_id: PoolId) -> Result<&PoolInfo, FerryError> {
        if self.is_shutdown {
            return Err(FerryError::Shutdown("system is shut down".to_string()));
        }
        let pool = self.pools.get(&pool_id).ok_or(FerryError::UnknownPool(pool_id))?;
        if pool.shutdown {
            return Err(FerryError::Shutdown(format!("pool {} is shut down", pool_id)));
        }
        Ok(pool)
    }

    /// Claim and split `pool_id`'s revenue.
    ///
    /// # Errors
    /// - `Shutdown` if the system or pool is shut down
    /// - `UnknownPool` if `pool_id` is not registered
    /// - `UntrustedDestination` / `Unauthorized` if the coordinator cannot
    ///   report debt on this splitter's behalf
    /// - `InsufficientMessageFee` if `native_fee` is below the debt message quote
    /// - `ZeroAmount` if nothing is claimable or the claim yields nothing
    pub fn earmark_rewards(
        &self,
        ctx: EarmarkContext<'_>,
        caller: &Address,
        pool_id: PoolId,
        native_fee: Amount,
    ) -> Result<EarmarkReceipt, FerryError> {
        let pool = *self.active_pool(pool_id)?;
        ctx.coordinator.ensure_splitter(&self.address)?;
        // The debt message has a fixed size, so the quote does not depend on the amount.
        ensure_fee(native_fee, ctx.coordinator.quote_debt_increase(ctx.outbox, 0)?)?;

        let claimable = ctx.yield_source.claimable(pool_id);
        if claimable == 0 {
            return Err(FerryError::ZeroAmount(format!(
                "nothing claimable for pool {}",
                pool_id
            )));
        }
        ctx.revenue
            .total_supply()
            .checked_add(claimable)
            .ok_or_else(|| FerryError::Overflow("revenue supply".to_string()))?;

        let claimed = ctx.yield_source.claim(pool_id);
        if claimed == 0 {
            return Err(FerryError::ZeroAmount(format!(
                "pool {} reported {} claimable but yielded nothing",
                pool_id, claimable
            )));
        }
        if claimed != claimable {
            tracing::warn!(
                "Pool {} claimed {} but {} was claimable",
                pool_id,
                claimed,
                claimable
            );
        }
        let split = self.params.split(claimed, self.treasury.is_some());

        ctx.revenue.mint(&self.address, claimed)?;
        ctx.revenue
            .transfer(&self.address, caller, split.caller_share)?;
        if let Some(treasury) = self.treasury {
            ctx.revenue
                .transfer(&self.address, &treasury, split.platform_share)?;
        }
        ctx.revenue
            .transfer(&self.address, &ctx.coordinator.address(), split.bridge_share)?;
        ctx.revenue
            .transfer(&self.address, &pool.reward_contract, split.pool_share)?;
        ctx.reward_pool.notify_reward_amount(pool_id, split.pool_share);

        let debt_message = if split.bridge_share > 0 {
            Some(ctx.coordinator.notify_debt(
                &self.address,
                ctx.outbox,
                split.bridge_share,
                native_fee,
            )?)
        } else {
            None
        };

        tracing::info!(
            "Earmarked pool {} on chain {}: revenue {} caller {} platform {} bridge {} pool {}",
            pool_id,
            self.chain_id,
            claimed,
            split.caller_share,
            split.platform_share,
            split.bridge_share,
            split.pool_share
        );

        Ok(EarmarkReceipt {
            pool_id,
            revenue: claimed,
            split,
            debt_message,
        })
    }

    /// Called by a pool's reward contract when `to` claims `amount` of revenue;
    /// pays the matching governance token emission out of the coordinator.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the pool's reward contract;
    /// `InsufficientCustody` if the coordinator's wrapped balance is short.
    pub fn reward_claimed(
        &self,
        coordinator: &SatelliteCoordinator,
        wrapped: &mut TokenLedger,
        caller: &Address,
        pool_id: PoolId,
        to: &Address,
        amount: Amount,
    ) -> Result<Amount, FerryError> {
        let pool = self.active_pool(pool_id)?;
        if *caller != pool.reward_contract {
            return Err(FerryError::Unauthorized(format!(
                "{} is not the reward contract of pool {}",
                caller, pool_id
            )));
        }
        coordinator.mint(wrapped, &self.address, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::outbox::FeeSchedule;
    use ferry_core::remote::RemoteEndpoint;
    use ferry_core::message::{Envelope, Payload};
    use ferry_economics::emission::RATE_SCALE;

    const L1: ChainId = 101;
    const L2: ChainId = 110;

    fn dao() -> Address {
        Address::derive("dao")
    }

    fn keeper() -> Address {
        Address::derive("keeper")
    }

    fn treasury() -> Address {
        Address::derive("treasury")
    }

    fn rewards() -> Address {
        Address::derive("pool-0/rewards")
    }

    #[derive(Default)]
    struct Source {
        claimable: BTreeMap<PoolId, Amount>,
        claims: u32,
        /// Report revenue but hand over nothing on claim.
        dry: bool,
    }

    impl YieldSource for Source {
        fn claimable(&self, pool_id: PoolId) -> Amount {
            self.claimable.get(&pool_id).copied().unwrap_or(0)
        }

        fn claim(&mut self, pool_id: PoolId) -> Amount {
            self.claims += 1;
            if self.dry {
                return 0;
            }
            self.claimable.remove(&pool_id).unwrap_or(0)
        }
    }

    #[derive(Default)]
    struct Pool {
        notified: Vec<(PoolId, Amount)>,
    }

    impl RewardPool for Pool {
        fn notify_reward_amount(&mut self, pool_id: PoolId, amount: Amount) {
            self.notified.push((pool_id, amount));
        }
    }

    struct Fixture {
        splitter: FeeSplitter,
        coordinator: SatelliteCoordinator,
        revenue: TokenLedger,
        outbox: Outbox,
        source: Source,
        pool: Pool,
    }

    impl Fixture {
        fn earmark(&mut self, pool_id: PoolId, fee: Amount) -> Result<EarmarkReceipt, FerryError> {
            let ctx = EarmarkContext {
                revenue: &mut self.revenue,
                coordinator: &self.coordinator,
                outbox: &mut self.outbox,
                yield_source: &mut self.source,
                reward_pool: &mut self.pool,
            };
            self.splitter.earmark_rewards(ctx, &keeper(), pool_id, fee)
        }
    }

    fn setup() -> Fixture {
        let mut splitter = FeeSplitter::new(Address::derive("l2/splitter"), L2, dao());
        let pool_id = splitter.add_pool(&dao(), rewards()).unwrap();
        assert_eq!(pool_id, 0);

        let mut coordinator =
            SatelliteCoordinator::new(Address::derive("l2/coordinator"), L2, L1, dao(), splitter.address());
        let endpoint = RemoteEndpoint {
            remote: Address::derive("l1/coordinator"),
            local: coordinator.address(),
        };
        coordinator.set_trusted_remote(&dao(), L1, endpoint).unwrap();

        let mut source = Source::default();
        source.claimable.insert(0, 1_000_000);
        Fixture {
            splitter,
            coordinator,
            revenue: TokenLedger::new("CRV"),
            outbox: Outbox::new(L2, FeeSchedule::default()),
            source,
            pool: Pool::default(),
        }
    }

    #[test]
    fn test_fee_split_scenario() {
        let mut f = setup();
        f.splitter
            .set_fees(&dao(), FeeSplitParameters::new(1_500, 900, 50, 50))
            .unwrap();
        f.splitter.set_treasury(&dao(), Some(treasury())).unwrap();

        let receipt = f.earmark(0, 0).unwrap();
        assert_eq!(receipt.revenue, 1_000_000);
        assert_eq!(f.revenue.balance_of(&keeper()), 5_000);
        assert_eq!(f.revenue.balance_of(&treasury()), 5_000);
        assert_eq!(f.coordinator.custody(&f.revenue), 240_000);
        assert_eq!(f.revenue.balance_of(&rewards()), 750_000);
        assert_eq!(f.revenue.balance_of(&f.splitter.address()), 0);
        assert_eq!(f.pool.notified, vec![(0, 750_000)]);

        let sent = f.outbox.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].decode_payload().unwrap(),
            Payload::DebtIncrease { chain_id: L2, amount: 240_000 }
        );
    }

    #[test]
    fn test_no_treasury_keeps_platform_share_in_pool() {
        let mut f = setup();
        f.splitter
            .set_fees(&dao(), FeeSplitParameters::new(1_500, 900, 50, 50))
            .unwrap();
        let receipt = f.earmark(0, 0).unwrap();
        assert_eq!(receipt.split.platform_share, 0);
        assert_eq!(f.revenue.balance_of(&rewards()), 755_000);
        assert_eq!(f.revenue.balance_of(&Address::ZERO), 0);
    }

    #[test]
    fn test_bounds_violation_keeps_previous_params() {
        let mut f = setup();
        let before = f.splitter.params();
        let result = f
            .splitter
            .set_fees(&dao(), FeeSplitParameters::new(2_000, 1_600, 50, 50));
        assert!(matches!(result, Err(FerryError::BoundsViolation(_))));
        assert_eq!(f.splitter.params(), before);
    }

    #[test]
    fn test_set_fees_fee_manager_only() {
        let mut f = setup();
        let manager = Address::derive("fee-manager");
        let params = FeeSplitParameters::new(500, 500, 50, 0);
        assert!(matches!(
            f.splitter.set_fees(&manager, params),
            Err(FerryError::Unauthorized(_))
        ));
        f.splitter.set_fee_manager(&dao(), manager).unwrap();
        f.splitter.set_fees(&manager, params).unwrap();
        assert!(f.splitter.set_fees(&dao(), params).is_err());
        assert_eq!(f.splitter.params(), params);
    }

    #[test]
    fn test_fee_shortfall_touches_nothing() {
        let mut f = setup();
        f.outbox = Outbox::new(L2, FeeSchedule { base_fee: 100, per_byte_fee: 0 });
        let result = f.earmark(0, 99);
        assert!(matches!(result, Err(FerryError::InsufficientMessageFee { .. })));
        assert_eq!(f.source.claims, 0);
        assert_eq!(f.revenue.total_supply(), 0);
        assert!(f.pool.notified.is_empty());
        assert!(f.earmark(0, 100).is_ok());
    }

    #[test]
    fn test_zero_claimable_rejected() {
        let mut f = setup();
        f.earmark(0, 0).unwrap();
        assert!(matches!(f.earmark(0, 0), Err(FerryError::ZeroAmount(_))));
        assert_eq!(f.outbox.pending_len(), 1);
    }

    #[test]
    fn test_empty_claim_rejected() {
        let mut f = setup();
        f.source.dry = true;
        assert!(matches!(f.earmark(0, 0), Err(FerryError::ZeroAmount(_))));
        assert_eq!(f.source.claims, 1);
        assert_eq!(f.revenue.total_supply(), 0);
        assert!(f.pool.notified.is_empty());
        assert_eq!(f.outbox.pending_len(), 0);
    }

    #[test]
    fn test_unknown_and_shutdown_pools() {
        let mut f = setup();
        assert!(matches!(f.earmark(7, 0), Err(FerryError::UnknownPool(7))));

        f.splitter.shutdown_pool(&dao(), 0).unwrap();
        assert!(matches!(f.earmark(0, 0), Err(FerryError::Shutdown(_))));
        assert_eq!(f.source.claims, 0);
    }

    #[test]
    fn test_system_shutdown() {
        let mut f = setup();
        assert!(f.splitter.shutdown_system(&keeper()).is_err());
        f.splitter.shutdown_system(&dao()).unwrap();
        assert!(matches!(f.earmark(0, 0), Err(FerryError::Shutdown(_))));
        assert!(f.splitter.add_pool(&dao(), rewards()).is_err());
    }

    #[test]
    fn test_pool_ids_are_sequential() {
        let mut f = setup();
        assert_eq!(f.splitter.add_pool(&dao(), Address::derive("pool-1")).unwrap(), 1);
        assert_eq!(f.splitter.add_pool(&dao(), Address::derive("pool-2")).unwrap(), 2);
        assert!(f.splitter.add_pool(&keeper(), Address::derive("pool-3")).is_err());
    }

    #[test]
    fn test_duplicate_reward_contract_rejected() {
        let mut f = setup();
        assert_eq!(
            f.splitter.add_pool(&dao(), rewards()),
            Err(FerryError::DuplicatePool(rewards()))
        );
        assert_eq!(f.splitter.pools().len(), 1);
    }

    #[test]
    fn test_reward_claimed_pays_emission() {
        let mut f = setup();
        let env = Envelope::new(
            L1,
            L2,
            0,
            Address::derive("l1/coordinator"),
            f.coordinator.address(),
            Payload::RateUpdate { rate: RATE_SCALE / 2 }.encode(),
        );
        assert!(f.coordinator.handle_inbound(&env).is_applied());

        let mut wrapped = TokenLedger::new("AURA");
        wrapped.mint(&f.coordinator.address(), 1_000).unwrap();
        let alice = Address::derive("alice");

        let paid = f
            .splitter
            .reward_claimed(&f.coordinator, &mut wrapped, &rewards(), 0, &alice, 600)
            .unwrap();
        assert_eq!(paid, 300);
        assert_eq!(wrapped.balance_of(&alice), 300);

        let result = f
            .splitter
            .reward_claimed(&f.coordinator, &mut wrapped, &keeper(), 0, &alice, 600);
        assert!(matches!(result, Err(FerryError::Unauthorized(_))));

        let result = f
            .splitter
            .reward_claimed(&f.coordinator, &mut wrapped, &rewards(), 0, &alice, 2_000);
        assert!(matches!(result, Err(FerryError::InsufficientCustody { .. })));
    }
}
