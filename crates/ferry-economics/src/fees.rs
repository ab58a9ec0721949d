// crates/ferry-economics/src/fees.rs
//
// Revenue fee split performed on every reward earmark on a satellite chain.
//
// Fractions are basis points of FEE_DENOMINATOR (10_000):
//   - lock + staker : canonical-bound (bridge) share, owed to the canonical chain
//   - caller        : incentive paid to whoever triggers the earmark
//   - platform      : paid to the platform treasury when one is set
//   - remainder     : reward pool share (absorbs all integer rounding)
//
// Bounds:
//   lock     300..=1500
//   staker   300..=1500
//   caller    10..=100
//   platform   0..=200
//   lock + staker + caller + platform <= MAX_FEES (4000)

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::types::Amount;

/// Denominator for all fee fractions.
pub const FEE_DENOMINATOR: u32 = 10_000;

/// Ceiling on the sum of all four fractions (40%).
pub const MAX_FEES: u32 = 4_000;

pub const LOCK_FEE_RANGE: RangeInclusive<u32> = 300..=1_500;
pub const STAKER_FEE_RANGE: RangeInclusive<u32> = 300..=1_500;
pub const CALLER_FEE_RANGE: RangeInclusive<u32> = 10..=100;
pub const PLATFORM_FEE_RANGE: RangeInclusive<u32> = 0..=200;

/// The four configurable fee fractions, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplitParameters {
    pub lock_bps: u32,
    pub staker_bps: u32,
    pub caller_bps: u32,
    pub platform_bps: u32,
}

impl Default for FeeSplitParameters {
    /// Deployment defaults: 5.5% lock, 11% staker, 0.5% caller, no platform fee.
    fn default() -> Self {
        Self {
            lock_bps: 550,
            staker_bps: 1_100,
            caller_bps: 50,
            platform_bps: 0,
        }
    }
}

impl FeeSplitParameters {
    pub fn new(lock_bps: u32, staker_bps: u32, caller_bps: u32, platform_bps: u32) -> Self {
        Self {
            lock_bps,
            staker_bps,
            caller_bps,
            platform_bps,
        }
    }

    /// Check every bound.
    ///
    /// # Errors
    /// Returns `FerryError::BoundsViolation` naming the first violated bound.
    pub fn validate(&self) -> Result<(), FerryError> {
        let total = self.lock_bps as u64
            + self.staker_bps as u64
            + self.caller_bps as u64
            + self.platform_bps as u64;
        if total > MAX_FEES as u64 {
            return Err(FerryError::BoundsViolation(format!(
                "total fees {} exceed max fees {}",
                total, MAX_FEES
            )));
        }
        check_range("lock", self.lock_bps, &LOCK_FEE_RANGE)?;
        check_range("staker", self.staker_bps, &STAKER_FEE_RANGE)?;
        check_range("caller", self.caller_bps, &CALLER_FEE_RANGE)?;
        check_range("platform", self.platform_bps, &PLATFORM_FEE_RANGE)?;
        Ok(())
    }

    /// Fraction of revenue owed to the canonical chain.
    pub fn bridge_bps(&self) -> u32 {
        self.lock_bps + self.staker_bps
    }

    /// Split `revenue` into the four shares.
    ///
    /// When `platform_enabled` is false (no treasury configured) the platform
    /// share is zero and stays with the pool. The pool share absorbs all
    /// rounding, so the shares always sum to `revenue` exactly.
    pub fn split(&self, revenue: Amount, platform_enabled: bool) -> FeeSplit {
        let caller_share = bps_of(revenue, self.caller_bps);
        let platform_share = if platform_enabled {
            bps_of(revenue, self.platform_bps)
        } else {
            0
        };
        let bridge_share = bps_of(revenue, self.bridge_bps());
        let pool_share = revenue - caller_share - platform_share - bridge_share;
        FeeSplit {
            caller_share,
            platform_share,
            bridge_share,
            pool_share,
        }
    }
}

fn check_range(name: &str, value: u32, range: &RangeInclusive<u32>) -> Result<(), FerryError> {
    if !range.contains(&value) {
        return Err(FerryError::BoundsViolation(format!(
            "{} fee {} outside {}..={}",
            name,
            value,
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

/// `amount * bps / FEE_DENOMINATOR`, rounded down, without intermediate overflow.
///
/// Requires `bps <= FEE_DENOMINATOR`, which every validated parameter set meets.
pub fn bps_of(amount: Amount, bps: u32) -> Amount {
    let denom = FEE_DENOMINATOR as Amount;
    let bps = bps as Amount;
    (amount / denom) * bps + (amount % denom) * bps / denom
}

/// Result of splitting one revenue amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub caller_share: Amount,
    pub platform_share: Amount,
    pub bridge_share: Amount,
    pub pool_share: Amount,
}

impl FeeSplit {
    pub fn total(&self) -> Amount {
        self.caller_share + self.platform_share + self.bridge_share + self.pool_share
    }
}
