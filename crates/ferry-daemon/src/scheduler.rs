// crates/ferry-daemon/src/scheduler.rs
//
// Cycle scheduler for the Ferry simulation daemon.
//
// Each cycle:
//   1. accrue jittered revenue on every pool and earmark it
//   2. pay emission on the freshly streamed pool share, at the last broadcast rate
//   3. relay everything in flight
//   4. every `distribute_every` cycles, distribute emission to each satellite
//   5. every `settle_every` cycles, settle each satellite's custody
//   6. relay again and check bridged-supply conservation

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ferry_core::error::FerryError;
use ferry_core::types::{Amount, ChainId};
use ferry_coordinator::chain::contract_address;
use ferry_economics::emission::{mul_div, RATE_SCALE};
use ferry_relay::Network;

use crate::config::DaemonConfig;
use crate::deployment::Deployment;

/// What one cycle did, in base units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle: u64,
    pub earmarked: Amount,
    pub emission_paid: Amount,
    pub distributed: Amount,
    pub settled: Amount,
    pub delivered: usize,
    pub conserved: bool,
}

pub struct CycleScheduler {
    config: DaemonConfig,
    deployment: Deployment,
    rng: StdRng,
    cycle: u64,
}

impl CycleScheduler {
    pub fn new(config: DaemonConfig, deployment: Deployment) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            deployment,
            rng,
            cycle: 0,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn network(&self) -> &Network {
        &self.deployment.network
    }

    /// Run cycles at the configured interval until the cycle budget is spent
    /// or Ctrl-C arrives, then write the snapshot if one is configured.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Cycle scheduler started (interval={}ms, cycles={})",
            self.config.cycle_interval_ms,
            self.config.cycles
        );
        let interval = Duration::from_millis(self.config.cycle_interval_ms);

        loop {
            if self.config.cycles > 0 && self.cycle >= self.config.cycles {
                tracing::info!("Cycle budget of {} reached", self.config.cycles);
                break;
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Cycle scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let summary = self.run_cycle();
                    tracing::info!(
                        "Cycle {}: earmarked {} emission {} distributed {} settled {} delivered {}",
                        summary.cycle,
                        summary.earmarked,
                        summary.emission_paid,
                        summary.distributed,
                        summary.settled,
                        summary.delivered
                    );
                }
            }
        }

        if let Some(path) = self.config.snapshot_path.clone() {
            self.write_snapshot(&path)?;
        }
        Ok(())
    }

    /// Run one cycle. Rejected operations are logged and skipped.
    pub fn run_cycle(&mut self) -> CycleSummary {
        self.cycle += 1;
        let mut summary = CycleSummary {
            cycle: self.cycle,
            ..CycleSummary::default()
        };
        let chains: Vec<ChainId> = self.deployment.pools.keys().copied().collect();

        for &chain_id in &chains {
            let (earmarked, paid) = self.earmark_chain(chain_id);
            summary.earmarked += earmarked;
            summary.emission_paid += paid;
        }
        summary.delivered += self.deployment.network.pump().len();

        if self.cycle % self.config.distribute_every == 0 {
            for &chain_id in &chains {
                summary.distributed += self.distribute(chain_id);
            }
        }
        if self.cycle % self.config.settle_every == 0 {
            for &chain_id in &chains {
                summary.settled += self.settle(chain_id);
            }
        }
        summary.delivered += self.deployment.network.pump().len();

        let network = &self.deployment.network;
        summary.conserved = network.relay.in_flight() == 0 && network.is_conserved();
        if !summary.conserved {
            tracing::warn!(
                "Bridged supply mismatch after cycle {}: custody {} wrapped {}",
                self.cycle,
                network.canonical.bridged_supply(),
                network.wrapped_supply()
            );
        }
        summary
    }

    fn jittered(&mut self, base: Amount) -> Amount {
        let jitter = self.config.yield_jitter_bps.min(10_000) as i64;
        let delta: i64 = self.rng.gen_range(-jitter..=jitter);
        let factor = (10_000 + delta) as Amount;
        base / 10_000 * factor + base % 10_000 * factor / 10_000
    }

    /// Accrue and earmark every pool on `chain_id`, then report each pool's
    /// streamed share as claimed by a staker.
    fn earmark_chain(&mut self, chain_id: ChainId) -> (Amount, Amount) {
        let pools = self
            .deployment
            .pools
            .get(&chain_id)
            .cloned()
            .unwrap_or_default();
        let base = self.deployment.yields.get(&chain_id).copied().unwrap_or(0);
        let keeper = self.deployment.keeper;
        let native_fee = self.config.native_fee as Amount;
        let staker = contract_address(chain_id, "staker");

        let mut earmarked = 0;
        let mut paid = 0;
        for pool_id in pools {
            let amount = self.jittered(base);
            if let Err(e) = self.deployment.network.accrue(chain_id, pool_id, amount) {
                tracing::warn!("Accrue on chain {} pool {} failed: {}", chain_id, pool_id, e);
                continue;
            }
            let Ok(sat) = self.deployment.network.satellite_mut(chain_id) else {
                continue;
            };
            let receipt = match sat.earmark_rewards(&keeper, pool_id, native_fee) {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!("Earmark on chain {} pool {} rejected: {}", chain_id, pool_id, e);
                    continue;
                }
            };
            earmarked += receipt.revenue;

            // Stakers claim the streamed share, capped at what the coordinator
            // can still pay out at the current rate.
            let rate = sat.coordinator.emission_rate();
            if rate == 0 {
                continue;
            }
            let held = sat.bridge.wrapped().balance_of(&sat.coordinator.address());
            let affordable = mul_div(held, RATE_SCALE, rate).unwrap_or(Amount::MAX);
            let claim = receipt.split.pool_share.min(affordable);
            let Some(reward_contract) = sat.splitter.pool(pool_id).map(|p| p.reward_contract) else {
                continue;
            };
            match sat.reward_claimed(&reward_contract, pool_id, &staker, claim) {
                Ok(amount) => paid += amount,
                Err(e) => tracing::debug!("Emission payout on chain {} skipped: {}", chain_id, e),
            }
        }
        (earmarked, paid)
    }

    fn distribute(&mut self, chain_id: ChainId) -> Amount {
        let keeper = self.deployment.keeper;
        let native_fee = self.config.native_fee as Amount;
        match self
            .deployment
            .network
            .canonical
            .distribute_emission(&keeper, chain_id, native_fee)
        {
            Ok(distribution) => distribution.minted,
            Err(FerryError::ZeroAmount(_)) => 0,
            Err(e) => {
                tracing::warn!("Distribution to chain {} rejected: {}", chain_id, e);
                0
            }
        }
    }

    fn settle(&mut self, chain_id: ChainId) -> Amount {
        let network = &mut self.deployment.network;
        let custody = match network.satellite(chain_id) {
            Ok(sat) => sat.custody(),
            Err(_) => return 0,
        };
        let amount = custody.min(network.canonical.coordinator.fee_debt(chain_id));
        if amount == 0 {
            return 0;
        }
        match network.settle(chain_id, amount) {
            Ok(()) => amount,
            Err(e) => {
                tracing::warn!("Settlement of chain {} failed: {}", chain_id, e);
                0
            }
        }
    }

    /// Write the network snapshot as pretty JSON.
    pub fn write_snapshot(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let json = self.deployment.network.snapshot().to_json()?;
        std::fs::write(path, json)?;
        tracing::info!("Wrote snapshot to {}", path);
        Ok(())
    }
}
