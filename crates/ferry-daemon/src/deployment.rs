// crates/ferry-daemon/src/deployment.rs
//
// Builds a simulated deployment from the daemon configuration: one canonical
// chain, the configured satellites wired to it, pools registered and fees set.

use std::collections::BTreeMap;

use ferry_core::error::FerryError;
use ferry_core::outbox::FeeSchedule;
use ferry_core::types::{Address, Amount, ChainId, PoolId};
use ferry_coordinator::chain::{contract_address, TokenSymbols};
use ferry_economics::emission::{CliffEmission, EmissionPolicy, LinearEmission, SupplyCap, RATE_SCALE};
use ferry_economics::token::ONE_TOKEN;
use ferry_relay::Network;

use crate::config::{DaemonConfig, EmissionConfig};

/// A built network plus the operator accounts and per-chain plan the
/// scheduler drives it with.
pub struct Deployment {
    pub network: Network,
    pub authority: Address,
    /// Triggers earmarks and distributions.
    pub keeper: Address,
    pub pools: BTreeMap<ChainId, Vec<PoolId>>,
    /// Revenue accrued per pool per cycle, in base units.
    pub yields: BTreeMap<ChainId, Amount>,
}

pub fn emission_policy(config: &EmissionConfig) -> Box<dyn EmissionPolicy> {
    match *config {
        EmissionConfig::Linear {
            numerator,
            denominator,
        } => Box::new(LinearEmission::new(numerator as Amount, denominator as Amount)),
        EmissionConfig::Cliff {
            base_rate_milli,
            cliff_tokens,
        } => Box::new(CliffEmission::new(
            RATE_SCALE / 1_000 * base_rate_milli as Amount,
            cliff_tokens as Amount * ONE_TOKEN,
        )),
    }
}

/// Deploy and wire every chain named in `config`.
///
/// # Errors
/// Any validation error from the configuration, or a wiring call rejected by
/// a contract.
pub fn build(config: &DaemonConfig) -> Result<Deployment, FerryError> {
    config.validate()?;

    let authority = Address::derive("ferry/governance");
    let keeper = Address::derive("ferry/keeper");
    let fee_schedule = FeeSchedule {
        base_fee: config.relay_fee.base_fee as Amount,
        per_byte_fee: config.relay_fee.per_byte_fee as Amount,
    };

    let mut network = Network::new(
        config.canonical_chain_id,
        authority,
        TokenSymbols::default(),
        emission_policy(&config.emission),
        SupplyCap::new(config.max_supply_tokens as Amount * ONE_TOKEN),
        fee_schedule,
    );
    network
        .canonical
        .coordinator
        .set_distributor(&authority, keeper, true)?;

    let treasury = config.treasury_address()?;
    let mut pools = BTreeMap::new();
    let mut yields = BTreeMap::new();

    for sat in &config.satellites {
        network.attach_satellite(sat.chain_id, contract_address(sat.chain_id, "delegate"))?;
        let mut ids = Vec::with_capacity(sat.pools as usize);
        for _ in 0..sat.pools {
            ids.push(network.add_pool(sat.chain_id)?);
        }

        let chain = network.satellite_mut(sat.chain_id)?;
        chain.splitter.set_fees(&authority, config.fees)?;
        chain.splitter.set_treasury(&authority, treasury)?;

        pools.insert(sat.chain_id, ids);
        yields.insert(sat.chain_id, sat.yield_per_cycle as Amount * ONE_TOKEN);
    }

    tracing::info!(
        "Deployed canonical chain {} with {} satellites",
        config.canonical_chain_id,
        config.satellites.len()
    );

    Ok(Deployment {
        network,
        authority,
        keeper,
        pools,
        yields,
    })
}
