// crates/ferry-relay/src/network.rs
//
// Network: one canonical chain, any number of satellites, and the relay
// between them.
//
// The harness performs the deployment wiring (trusted remotes, satellite
// coordinators, bridge delegates) through each contract's governance entry
// points, and models the one leg the protocol leaves off-chain: the bridge
// delegate carrying revenue from a satellite to the canonical chain.

use std::collections::{BTreeMap, HashSet};

use ferry_core::error::FerryError;
use ferry_core::message::{Envelope, Payload};
use ferry_core::outbox::FeeSchedule;
use ferry_core::remote::RemoteEndpoint;
use ferry_core::traits::InboundHandler;
use ferry_core::types::{Address, Amount, ChainId, PoolId};
use ferry_coordinator::chain::{
    contract_address, CanonicalChain, NetworkSnapshot, SatelliteChain, TokenSymbols,
};
use ferry_economics::emission::{EmissionPolicy, SupplyCap};

use crate::relay::{DeliveryReport, MemoryRelay};
use crate::sim::{MemoryRewardPool, MemoryVoteEscrow, MemoryYieldSource};

/// Upper bound on collect/deliver rounds in one `pump`.
pub const MAX_PUMP_ROUNDS: usize = 64;

/// Harness-side handles onto a satellite's simulated collaborators.
#[derive(Debug, Clone)]
pub struct SatelliteHandles {
    pub yield_source: MemoryYieldSource,
    pub reward_pool: MemoryRewardPool,
    pub delegate: Address,
}

pub struct Network {
    pub canonical: CanonicalChain,
    pub satellites: BTreeMap<ChainId, SatelliteChain>,
    pub relay: MemoryRelay,
    authority: Address,
    symbols: TokenSymbols,
    fee_schedule: FeeSchedule,
    escrow: MemoryVoteEscrow,
    handles: BTreeMap<ChainId, SatelliteHandles>,
}

impl Network {
    pub fn new(
        canonical_chain_id: ChainId,
        authority: Address,
        symbols: TokenSymbols,
        policy: Box<dyn EmissionPolicy>,
        supply_cap: SupplyCap,
        fee_schedule: FeeSchedule,
    ) -> Self {
        let escrow = MemoryVoteEscrow::new(contract_address(canonical_chain_id, "vote-escrow"));
        let canonical = CanonicalChain::new(
            canonical_chain_id,
            authority,
            &symbols,
            policy,
            supply_cap,
            fee_schedule,
            Box::new(escrow.clone()),
        );
        Self {
            canonical,
            satellites: BTreeMap::new(),
            relay: MemoryRelay::new(),
            authority,
            symbols,
            fee_schedule,
            escrow,
            handles: BTreeMap::new(),
        }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn canonical_chain_id(&self) -> ChainId {
        self.canonical.chain_id
    }

    pub fn escrow(&self) -> &MemoryVoteEscrow {
        &self.escrow
    }

    /// Deploy a satellite and wire it to the canonical chain in both directions.
    /// `delegate` becomes the chain's bridge delegate on both sides.
    ///
    /// # Errors
    /// `UnknownChain` if `chain_id` is the canonical chain or already attached.
    pub fn attach_satellite(&mut self, chain_id: ChainId, delegate: Address) -> Result<(), FerryError> {
        let l1 = self.canonical.chain_id;
        if chain_id == l1 || self.satellites.contains_key(&chain_id) {
            return Err(FerryError::UnknownChain(chain_id));
        }
        let auth = self.authority;

        let handles = SatelliteHandles {
            yield_source: MemoryYieldSource::new(),
            reward_pool: MemoryRewardPool::new(),
            delegate,
        };
        let mut sat = SatelliteChain::new(
            chain_id,
            l1,
            auth,
            &self.symbols,
            self.fee_schedule,
            Box::new(handles.yield_source.clone()),
            Box::new(handles.reward_pool.clone()),
        );

        let l1_bridge = self.canonical.bridge.address();
        let l1_coordinator = self.canonical.coordinator.address();
        let sat_bridge = sat.bridge.address();
        let sat_coordinator = sat.coordinator.address();

        sat.bridge.set_trusted_remote(
            &auth,
            l1,
            RemoteEndpoint {
                remote: l1_bridge,
                local: sat_bridge,
            },
        )?;
        sat.coordinator.set_trusted_remote(
            &auth,
            l1,
            RemoteEndpoint {
                remote: l1_coordinator,
                local: sat_coordinator,
            },
        )?;
        sat.coordinator.set_bridge_delegate(&auth, delegate)?;

        self.canonical.bridge.set_trusted_remote(
            &auth,
            chain_id,
            RemoteEndpoint {
                remote: sat_bridge,
                local: l1_bridge,
            },
        )?;
        let coordinator = &mut self.canonical.coordinator;
        coordinator.set_trusted_remote(
            &auth,
            chain_id,
            RemoteEndpoint {
                remote: sat_coordinator,
                local: l1_coordinator,
            },
        )?;
        coordinator.set_satellite_coordinator(&auth, chain_id, sat_coordinator)?;
        coordinator.set_bridge_delegate(&auth, chain_id, delegate)?;

        tracing::info!("Attached satellite chain {} (delegate {})", chain_id, delegate);
        self.satellites.insert(chain_id, sat);
        self.handles.insert(chain_id, handles);
        Ok(())
    }

    pub fn satellite(&self, chain_id: ChainId) -> Result<&SatelliteChain, FerryError> {
        self.satellites
            .get(&chain_id)
            .ok_or(FerryError::UnknownChain(chain_id))
    }

    pub fn satellite_mut(&mut self, chain_id: ChainId) -> Result<&mut SatelliteChain, FerryError> {
        self.satellites
            .get_mut(&chain_id)
            .ok_or(FerryError::UnknownChain(chain_id))
    }

    pub fn handles(&self, chain_id: ChainId) -> Result<&SatelliteHandles, FerryError> {
        self.handles
            .get(&chain_id)
            .ok_or(FerryError::UnknownChain(chain_id))
    }

    pub fn satellite_ids(&self) -> Vec<ChainId> {
        self.satellites.keys().copied().collect()
    }

    /// Register a pool on `chain_id`'s splitter with a derived reward contract.
    pub fn add_pool(&mut self, chain_id: ChainId) -> Result<PoolId, FerryError> {
        let auth = self.authority;
        let sat = self.satellite_mut(chain_id)?;
        let next = sat.splitter.pools().len();
        let reward_contract = contract_address(chain_id, &format!("pool-{}/rewards", next));
        sat.splitter.add_pool(&auth, reward_contract)
    }

    /// Make `amount` of revenue claimable for `pool_id` on `chain_id`.
    pub fn accrue(&self, chain_id: ChainId, pool_id: PoolId, amount: Amount) -> Result<(), FerryError> {
        self.handles(chain_id)?.yield_source.accrue(pool_id, amount);
        Ok(())
    }

    /// Move every pending outbox message onto the relay.
    pub fn collect(&mut self) -> usize {
        let mut count = self.relay.collect(&mut self.canonical);
        for sat in self.satellites.values_mut() {
            count += self.relay.collect(sat);
        }
        count
    }

    /// Deliver the next message on `src -> dst`, if any.
    pub fn deliver_next(&mut self, src: ChainId, dst: ChainId) -> Option<DeliveryReport> {
        let Self {
            canonical,
            satellites,
            relay,
            ..
        } = self;
        let envelope = relay.pop_next(src, dst)?;
        let target: &mut dyn InboundHandler = if dst == canonical.chain_id {
            canonical
        } else if let Some(sat) = satellites.get_mut(&dst) {
            sat
        } else {
            return Some(relay.discard(envelope, "unknown destination chain"));
        };
        Some(relay.deliver(envelope, target))
    }

    fn drain_path(&mut self, src: ChainId, dst: ChainId, reports: &mut Vec<DeliveryReport>) {
        while let Some(report) = self.deliver_next(src, dst) {
            reports.push(report);
        }
    }

    /// Collect and deliver until nothing is in flight.
    pub fn pump(&mut self) -> Vec<DeliveryReport> {
        self.pump_ordered(&[])
    }

    /// Like `pump`, but within each round deliver traffic from the chains in
    /// `source_order` first, in that order, before the remaining paths.
    pub fn pump_ordered(&mut self, source_order: &[ChainId]) -> Vec<DeliveryReport> {
        let mut reports = Vec::new();
        for _ in 0..MAX_PUMP_ROUNDS {
            self.collect();
            let paths = self.relay.busy_paths();
            if paths.is_empty() {
                return reports;
            }
            for src in source_order {
                for (path_src, dst) in paths.iter().filter(|(s, _)| s == src) {
                    self.drain_path(*path_src, *dst, &mut reports);
                }
            }
            for (src, dst) in paths {
                self.drain_path(src, dst, &mut reports);
            }
        }
        tracing::warn!(
            "Relay still busy after {} rounds ({} in flight)",
            MAX_PUMP_ROUNDS,
            self.relay.in_flight()
        );
        reports
    }

    /// Off-protocol leg: the delegate's revenue on `chain_id` is carried to the
    /// canonical chain. Modeled as burn on the satellite, mint on canonical.
    pub fn carry_revenue(&mut self, chain_id: ChainId, amount: Amount) -> Result<(), FerryError> {
        let delegate = self.handles(chain_id)?.delegate;
        let sat = self.satellite_mut(chain_id)?;
        sat.revenue.burn(&delegate, amount)?;
        self.canonical.revenue.mint(&delegate, amount)
    }

    /// Full settlement round trip for `amount` of `chain_id`'s debt: pull
    /// custody on the satellite, carry it across, settle on canonical.
    ///
    /// A failure on the canonical side (e.g. the debt increase is still in
    /// flight) leaves the revenue with the delegate on the canonical chain.
    pub fn settle(&mut self, chain_id: ChainId, amount: Amount) -> Result<(), FerryError> {
        let delegate = self.handles(chain_id)?.delegate;
        self.satellite_mut(chain_id)?
            .settle_to_canonical(&delegate, amount)?;
        self.carry_revenue(chain_id, amount)?;
        self.canonical.settle_fee_debt(&delegate, chain_id, amount)
    }

    /// Wrapped supply across all satellites.
    pub fn wrapped_supply(&self) -> Amount {
        self.satellites.values().map(SatelliteChain::wrapped_supply).sum()
    }

    /// Governance token moving through the relay: bridge transfers and locks
    /// collected but not yet delivered. Replays of an already delivered or
    /// already counted message, and envelopes the destination bridge would
    /// not trust, carry nothing.
    pub fn in_flight_bridged(&self) -> Amount {
        let mut counted = HashSet::new();
        let pending = self
            .relay
            .queued()
            .chain(self.canonical.outbox.pending())
            .chain(self.satellites.values().flat_map(|s| s.outbox.pending()));
        pending
            .filter(|env| !self.relay.is_delivered(&env.id) && self.bridge_trusts(env))
            .filter(|env| counted.insert(env.id))
            .filter_map(|env| match env.decode_payload() {
                Ok(Payload::TokenTransfer { amount, .. }) | Ok(Payload::Lock { amount, .. }) => {
                    Some(amount)
                }
                _ => None,
            })
            .sum()
    }

    /// True iff the bridge on `env`'s destination chain accepts its sender pair.
    fn bridge_trusts(&self, env: &Envelope) -> bool {
        let remotes = if env.dst_chain == self.canonical.chain_id {
            self.canonical.bridge.remotes()
        } else if let Some(sat) = self.satellites.get(&env.dst_chain) {
            sat.bridge.remotes()
        } else {
            return false;
        };
        remotes.validate_inbound(env.src_chain, &env.sender_pair())
    }

    /// Canonical custody equals wrapped supply plus whatever is in flight.
    /// At quiescence this is the plain custody == wrapped supply check.
    pub fn is_conserved(&self) -> bool {
        self.canonical.bridged_supply() == self.wrapped_supply() + self.in_flight_bridged()
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            canonical: self.canonical.snapshot(),
            satellites: self.satellites.values().map(SatelliteChain::snapshot).collect(),
        }
    }
}
