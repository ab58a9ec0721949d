// crates/ferry-coordinator/src/lib.rs
//
// ferry-coordinator: the fee-debt and emission state machines.
//
// - canonical: authoritative fee-debt ledger, settlement, emission distribution
// - satellite: emission rate holder and revenue custody on each satellite
// - splitter:  revenue fee split performed on every reward earmark
// - chain:     per-chain aggregates the relay delivers into, plus snapshots

pub mod canonical;
pub mod chain;
pub mod satellite;
pub mod splitter;

pub use canonical::{CanonicalCoordinator, Distribution};
pub use chain::{
    contract_address, CanonicalChain, CanonicalSnapshot, NetworkSnapshot, SatelliteChain,
    SatelliteSnapshot, TokenSymbols,
};
pub use satellite::SatelliteCoordinator;
pub use splitter::{EarmarkContext, EarmarkReceipt, FeeSplitter, PoolInfo};
