// crates/ferry-bridge/src/lib.rs
//
// ferry-bridge: the governance token bridge pair.
//
// The canonical side locks real token in custody; each satellite side mints
// and burns a wrapped token. Together they keep
//   custody on canonical == sum of wrapped supply on satellites
// whenever no transfer is in flight.

pub mod canonical;
pub mod satellite;

pub use canonical::CanonicalBridge;
pub use satellite::SatelliteBridge;
