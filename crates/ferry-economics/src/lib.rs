// crates/ferry-economics/src/lib.rs
//
// ferry-economics: token ledgers, revenue fee split, and emission policies
// for the Ferry protocol.
//
// All monetary values are integers in the token's smallest unit.
// 1 token = 1,000,000,000,000,000,000 units (10^18).

pub mod emission;
pub mod fees;
pub mod token;

// Re-export key types for ergonomic access from downstream crates.
pub use emission::{
    apply_rate, emission_rate, mul_div, CliffEmission, EmissionPolicy, LinearEmission, SupplyCap,
    RATE_SCALE,
};
pub use fees::{FeeSplit, FeeSplitParameters, FEE_DENOMINATOR, MAX_FEES};
pub use token::{TokenLedger, ONE_TOKEN, TOKEN_DECIMALS};
