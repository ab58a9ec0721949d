// crates/ferry-core/src/lib.rs
//
// ferry-core: Core types, error taxonomy, governance, trusted-remote registry,
// wire messages, and outbox for the Ferry protocol.
//
// This is the leaf crate that all other crates in the workspace depend on.
// Nothing in here knows about tokens or coordinators; it only defines what a
// chain is, who may administer it, and what crosses the relay.

pub mod error;
pub mod governance;
pub mod message;
pub mod outbox;
pub mod remote;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use ferry_core::Address;`

pub use error::FerryError;
pub use governance::Governance;
pub use message::{Envelope, MessageId, Payload};
pub use outbox::{FeeSchedule, Outbox};
pub use remote::{RemoteEndpoint, TrustedRemoteRegistry};
pub use traits::{InboundHandler, InboundOutcome, RewardPool, VoteEscrow, YieldSource};
pub use types::{Address, Amount, ChainId, PoolId};
