// crates/ferry-relay/src/lib.rs
//
// ferry-relay: in-memory transport and a multi-chain harness.
//
// The relay is at-most-once per message id and in-order per (src, dst) path.
// It never reorders within a path but freely interleaves paths, which is how
// the harness exercises cross-chain reordering.

pub mod network;
pub mod relay;
pub mod sim;

pub use network::{Network, SatelliteHandles, MAX_PUMP_ROUNDS};
pub use relay::{DeliveryReport, MemoryRelay, RelayStats, DEDUP_WINDOW};
pub use sim::{MemoryRewardPool, MemoryVoteEscrow, MemoryYieldSource};
