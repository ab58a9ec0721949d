use thiserror::Error;

use crate::types::{Address, Amount, ChainId, PoolId};

/// Protocol-wide error types for the Ferry protocol.
///
/// Every variant aborts the whole local transition. `Unauthenticated` is the
/// one variant that never reaches a relay: inbound handlers turn it into a
/// silent drop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FerryError {
    /// Caller is not the registered principal for the action.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Inbound message sender pair does not match the trusted remote.
    #[error("Unauthenticated message from chain {chain_id}")]
    Unauthenticated { chain_id: ChainId },

    /// Settlement larger than the outstanding fee debt.
    #[error("Settlement of {amount} exceeds outstanding debt {debt} for chain {chain_id}")]
    ExceedsDebt {
        chain_id: ChainId,
        amount: Amount,
        debt: Amount,
    },

    /// Coordinator does not hold enough of the requested token.
    #[error("Insufficient custody: requested {requested} but only {available} held")]
    InsufficientCustody { requested: Amount, available: Amount },

    /// Account cannot cover a transfer, burn, or lock.
    #[error("Insufficient balance for {account}: requested {requested} but only {available} available")]
    InsufficientBalance {
        account: Address,
        requested: Amount,
        available: Amount,
    },

    /// Minting would push total supply past the tokenomics ceiling.
    #[error("Inflation ceiling exceeded: minting {amount} on supply {supply} passes cap {cap}")]
    InflationCeilingExceeded {
        amount: Amount,
        supply: Amount,
        cap: Amount,
    },

    /// Fee-parameter update outside the allowed ranges.
    #[error("Bounds violation: {0}")]
    BoundsViolation(String),

    /// Guarded no-op rejection of a zero-value operation.
    #[error("Zero amount: {0}")]
    ZeroAmount(String),

    /// No trusted remote is registered for the destination chain.
    #[error("No trusted remote registered for destination chain {0}")]
    UntrustedDestination(ChainId),

    /// The caller did not attach enough native fee for the outbound messages.
    #[error("Insufficient message fee: attached {attached} but {required} required")]
    InsufficientMessageFee { attached: Amount, required: Amount },

    /// Chain id has no registration on this coordinator.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),

    /// Pool id has no registration on this splitter.
    #[error("Unknown pool: {0}")]
    UnknownPool(PoolId),

    /// Reward contract is already registered for another pool.
    #[error("Reward contract {0} already backs a pool")]
    DuplicatePool(Address),

    /// The system or the pool has been shut down.
    #[error("Shutdown: {0}")]
    Shutdown(String),

    /// Wire payload or address could not be decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Checked arithmetic overflowed.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

impl From<serde_json::Error> for FerryError {
    fn from(e: serde_json::Error) -> Self {
        FerryError::Codec(e.to_string())
    }
}

impl From<hex::FromHexError> for FerryError {
    fn from(e: hex::FromHexError) -> Self {
        FerryError::Codec(e.to_string())
    }
}
