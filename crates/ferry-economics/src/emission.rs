// crates/ferry-economics/src/emission.rs
//
// Emission policies: how much governance token a satellite chain's accrued fee
// debt entitles it to when the canonical coordinator distributes.
//
// The formula is pluggable behind `EmissionPolicy`. Two policies ship:
//   - LinearEmission: a fixed ratio of governance token per unit of debt
//   - CliffEmission:  the ratio halves every `cliff_size` of total supply,
//                     the same shape as a block-reward halving schedule keyed
//                     on supply instead of height
//
// Rates broadcast to satellites are scaled by RATE_SCALE (10^18).

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::types::{Amount, ChainId};

/// Fixed-point scale of emission rates: a rate of RATE_SCALE mints one unit of
/// governance token per unit of revenue.
pub const RATE_SCALE: Amount = 1_000_000_000_000_000_000;

/// Number of cliffs after which `CliffEmission` mints nothing.
pub const MAX_CLIFFS: u32 = 64;

/// Tokenomics policy turning accrued debt into a mint amount.
pub trait EmissionPolicy: Send + Sync {
    /// Governance token to mint for `debt` of revenue accrued on `chain_id`,
    /// given the current total governance token supply.
    fn compute_emission(&self, chain_id: ChainId, debt: Amount, total_supply: Amount) -> Amount;
}

/// Mint `numerator / denominator` governance token per unit of debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearEmission {
    pub numerator: Amount,
    pub denominator: Amount,
}

impl LinearEmission {
    pub fn new(numerator: Amount, denominator: Amount) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl EmissionPolicy for LinearEmission {
    fn compute_emission(&self, _chain_id: ChainId, debt: Amount, _total_supply: Amount) -> Amount {
        mul_div(debt, self.numerator, self.denominator).unwrap_or(0)
    }
}

/// Mint `base_rate` (RATE_SCALE-scaled) per unit of debt, halving every
/// `cliff_size` of total supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffEmission {
    pub base_rate: Amount,
    pub cliff_size: Amount,
}

impl CliffEmission {
    pub fn new(base_rate: Amount, cliff_size: Amount) -> Self {
        Self {
            base_rate,
            cliff_size,
        }
    }

    /// Rate in effect at `total_supply`.
    ///
    /// Returns 0 once `MAX_CLIFFS` cliffs have been passed.
    pub fn rate_at_supply(&self, total_supply: Amount) -> Amount {
        if self.cliff_size == 0 {
            return self.base_rate;
        }
        let cliff = total_supply / self.cliff_size;
        if cliff >= MAX_CLIFFS as Amount {
            return 0;
        }
        self.base_rate >> cliff
    }
}

impl EmissionPolicy for CliffEmission {
    fn compute_emission(&self, _chain_id: ChainId, debt: Amount, total_supply: Amount) -> Amount {
        apply_rate(debt, self.rate_at_supply(total_supply))
    }
}

/// Hard ceiling on total governance token supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCap {
    pub max_supply: Amount,
}

impl SupplyCap {
    pub fn new(max_supply: Amount) -> Self {
        Self { max_supply }
    }

    /// Fail with `InflationCeilingExceeded` if minting `amount` on top of
    /// `supply` would pass the cap.
    pub fn check(&self, supply: Amount, amount: Amount) -> Result<(), FerryError> {
        match supply.checked_add(amount) {
            Some(total) if total <= self.max_supply => Ok(()),
            _ => Err(FerryError::InflationCeilingExceeded {
                amount,
                supply,
                cap: self.max_supply,
            }),
        }
    }

    /// Room left under the cap.
    pub fn headroom(&self, supply: Amount) -> Amount {
        self.max_supply.saturating_sub(supply)
    }
}

/// Rate broadcast for a distribution: `minted * RATE_SCALE / debt`.
///
/// Returns 0 when `debt` is 0.
pub fn emission_rate(minted: Amount, debt: Amount) -> Amount {
    mul_div(minted, RATE_SCALE, debt).unwrap_or(0)
}

/// Governance token earned for `revenue` at `rate`: `revenue * rate / RATE_SCALE`.
pub fn apply_rate(revenue: Amount, rate: Amount) -> Amount {
    mul_div(revenue, rate, RATE_SCALE).unwrap_or(Amount::MAX)
}

/// `a * b / c` rounded down, computed without overflowing the intermediate
/// product. Returns `None` when `c == 0` or the result does not fit in u128.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Option<Amount> {
    if c == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / c);
    }
    // a * b = (q * c + r) * b  with q = a / c, r = a % c
    //       = q * b * c + r * b
    let q = a / c;
    let r = a % c;
    let whole = q.checked_mul(b)?;
    whole.checked_add(mul_div_small(r, b, c))
}

// floor(r * b / c) for r < c, by shift-and-add over the bits of b. The
// running remainder stays below c so nothing overflows.
fn mul_div_small(r: Amount, b: Amount, c: Amount) -> Amount {
    let mut quotient: Amount = 0;
    let mut remainder: Amount = 0;
    for bit in (0..128).rev() {
        quotient <<= 1;
        if remainder >= c - remainder {
            remainder -= c - remainder;
            quotient += 1;
        } else {
            remainder <<= 1;
        }
        if (b >> bit) & 1 == 1 {
            if remainder >= c - r {
                remainder -= c - r;
                quotient += 1;
            } else {
                remainder += r;
            }
        }
    }
    quotient
}
