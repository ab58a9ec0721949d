// crates/ferry-daemon/src/config.rs
//
// Deployment and run configuration for the Ferry simulation daemon.
// Loaded from a TOML file or populated with sensible defaults.
//
// Token amounts in the file are whole tokens (TOML integers are 64-bit);
// they are scaled by 10^18 when the deployment is built.

use serde::Deserialize;
use std::fs;

use ferry_core::error::FerryError;
use ferry_core::types::{Address, ChainId};
use ferry_economics::fees::FeeSplitParameters;

/// One satellite chain to deploy.
#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteConfig {
    pub chain_id: ChainId,

    /// Number of staking pools registered on the chain's splitter.
    #[serde(default = "default_pools")]
    pub pools: u32,

    /// Revenue accrued per pool per cycle, in whole tokens.
    #[serde(default = "default_yield_per_cycle")]
    pub yield_per_cycle: u64,
}

/// Emission policy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmissionConfig {
    /// Fixed `numerator / denominator` governance token per unit of revenue.
    Linear { numerator: u64, denominator: u64 },
    /// Rate in 1/1000ths halving every `cliff_tokens` of supply.
    Cliff { base_rate_milli: u64, cliff_tokens: u64 },
}

impl Default for EmissionConfig {
    fn default() -> Self {
        EmissionConfig::Linear {
            numerator: 1,
            denominator: 2,
        }
    }
}

/// Native fee charged by the simulated relay, in the chain's smallest unit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RelayFeeConfig {
    #[serde(default)]
    pub base_fee: u64,
    #[serde(default)]
    pub per_byte_fee: u64,
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Relay chain id of the canonical chain.
    #[serde(default = "default_canonical_chain_id")]
    pub canonical_chain_id: ChainId,

    #[serde(default = "default_satellites")]
    pub satellites: Vec<SatelliteConfig>,

    /// Fee split applied on every satellite.
    #[serde(default)]
    pub fees: FeeSplitParameters,

    /// Platform treasury address (hex). Unset means no platform fee is paid.
    #[serde(default)]
    pub treasury: Option<String>,

    #[serde(default)]
    pub emission: EmissionConfig,

    /// Governance token supply ceiling, in whole tokens.
    #[serde(default = "default_max_supply_tokens")]
    pub max_supply_tokens: u64,

    #[serde(default)]
    pub relay_fee: RelayFeeConfig,

    /// Native fee attached to every fee-bearing call.
    #[serde(default = "default_native_fee")]
    pub native_fee: u64,

    /// Delay between cycles in milliseconds.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Cycles to run before exiting. 0 runs until Ctrl-C.
    #[serde(default)]
    pub cycles: u64,

    /// Distribute emission every N cycles.
    #[serde(default = "default_distribute_every")]
    pub distribute_every: u64,

    /// Settle fee debt every N cycles.
    #[serde(default = "default_settle_every")]
    pub settle_every: u64,

    /// Max relative deviation of per-cycle yield, in basis points.
    #[serde(default = "default_yield_jitter_bps")]
    pub yield_jitter_bps: u32,

    /// RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Where to write the final JSON snapshot.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_pools() -> u32 {
    2
}

fn default_yield_per_cycle() -> u64 {
    1_000
}

fn default_canonical_chain_id() -> ChainId {
    101
}

fn default_satellites() -> Vec<SatelliteConfig> {
    [110, 111]
        .into_iter()
        .map(|chain_id| SatelliteConfig {
            chain_id,
            pools: default_pools(),
            yield_per_cycle: default_yield_per_cycle(),
        })
        .collect()
}

fn default_max_supply_tokens() -> u64 {
    100_000_000
}

fn default_native_fee() -> u64 {
    0
}

fn default_cycle_interval_ms() -> u64 {
    1_000
}

fn default_distribute_every() -> u64 {
    5
}

fn default_settle_every() -> u64 {
    5
}

fn default_yield_jitter_bps() -> u32 {
    2_000
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            canonical_chain_id: default_canonical_chain_id(),
            satellites: default_satellites(),
            fees: FeeSplitParameters::default(),
            treasury: None,
            emission: EmissionConfig::default(),
            max_supply_tokens: default_max_supply_tokens(),
            relay_fee: RelayFeeConfig::default(),
            native_fee: default_native_fee(),
            cycle_interval_ms: default_cycle_interval_ms(),
            cycles: 0,
            distribute_every: default_distribute_every(),
            settle_every: default_settle_every(),
            yield_jitter_bps: default_yield_jitter_bps(),
            seed: None,
            snapshot_path: None,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Reject configurations the deployment could never run with.
    pub fn validate(&self) -> Result<(), FerryError> {
        self.fees.validate()?;
        for sat in &self.satellites {
            if sat.chain_id == self.canonical_chain_id {
                return Err(FerryError::UnknownChain(sat.chain_id));
            }
        }
        if self.distribute_every == 0 || self.settle_every == 0 {
            return Err(FerryError::ZeroAmount(
                "distribute_every and settle_every must be positive".to_string(),
            ));
        }
        if let EmissionConfig::Linear { denominator: 0, .. } = self.emission {
            return Err(FerryError::ZeroAmount("emission denominator".to_string()));
        }
        self.treasury_address()?;
        Ok(())
    }

    pub fn treasury_address(&self) -> Result<Option<Address>, FerryError> {
        self.treasury.as_deref().map(str::parse::<Address>).transpose()
    }
}
