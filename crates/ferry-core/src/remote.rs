// crates/ferry-core/src/remote.rs
//
// Trusted-remote registry: per remote chain, the only (remote contract,
// local contract) pair a contract accepts messages from and sends messages to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FerryError;
use crate::governance::Governance;
use crate::types::{Address, ChainId};

/// Authorized address pair for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    /// Contract on the remote chain.
    pub remote: Address,
    /// Contract on this chain.
    pub local: Address,
}

/// Registry of trusted remotes for one contract, keyed by remote chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedRemoteRegistry {
    entries: BTreeMap<ChainId, RemoteEndpoint>,
}

impl TrustedRemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the trusted remote for `chain_id`.
    ///
    /// # Errors
    /// Returns `FerryError::Unauthorized` if `caller` is not the contract's
    /// governance authority.
    pub fn set_trusted_remote(
        &mut self,
        governance: &Governance,
        caller: &Address,
        chain_id: ChainId,
        endpoint: RemoteEndpoint,
    ) -> Result<(), FerryError> {
        governance.ensure_authority(caller)?;
        tracing::info!(
            "Trusted remote for chain {} set to remote={} local={}",
            chain_id,
            endpoint.remote,
            endpoint.local
        );
        self.entries.insert(chain_id, endpoint);
        Ok(())
    }

    /// Returns true iff `sender` exactly matches the registered pair.
    pub fn validate_inbound(&self, chain_id: ChainId, sender: &RemoteEndpoint) -> bool {
        self.entries
            .get(&chain_id)
            .map(|registered| registered == sender)
            .unwrap_or(false)
    }

    pub fn trusted_remote(&self, chain_id: ChainId) -> Option<&RemoteEndpoint> {
        self.entries.get(&chain_id)
    }

    /// Like `trusted_remote`, but fails with `UntrustedDestination` when unset.
    pub fn require(&self, chain_id: ChainId) -> Result<&RemoteEndpoint, FerryError> {
        self.entries
            .get(&chain_id)
            .ok_or(FerryError::UntrustedDestination(chain_id))
    }

    pub fn entries(&self) -> &BTreeMap<ChainId, RemoteEndpoint> {
        &self.entries
    }

    /// Registered chain ids in ascending order.
    pub fn chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dao() -> Address {
        Address::derive("dao")
    }

    fn endpoint(tag: &str) -> RemoteEndpoint {
        RemoteEndpoint {
            remote: Address::derive(&format!("{}/remote", tag)),
            local: Address::derive(&format!("{}/local", tag)),
        }
    }

    #[test]
    fn test_unregistered_chain_fails_validation() {
        let registry = TrustedRemoteRegistry::new();
        assert!(!registry.validate_inbound(7, &endpoint("a")));
        assert!(matches!(
            registry.require(7),
            Err(FerryError::UntrustedDestination(7))
        ));
    }

    #[test]
    fn test_validate_exact_pair_only() {
        let gov = Governance::new(dao());
        let mut registry = TrustedRemoteRegistry::new();
        let ep = endpoint("a");
        registry.set_trusted_remote(&gov, &dao(), 7, ep).unwrap();

        assert!(registry.validate_inbound(7, &ep));
        // Right remote, wrong local.
        let mut swapped = ep;
        swapped.local = Address::derive("other");
        assert!(!registry.validate_inbound(7, &swapped));
        // Right pair, wrong chain.
        assert!(!registry.validate_inbound(8, &ep));
    }

    #[test]
    fn test_only_governance_can_register() {
        let gov = Governance::new(dao());
        let mut registry = TrustedRemoteRegistry::new();
        let result = registry.set_trusted_remote(&gov, &Address::derive("mallory"), 7, endpoint("a"));
        assert!(matches!(result, Err(FerryError::Unauthorized(_))));
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn test_overwrite_is_idempotent_and_order_independent() {
        let gov = Governance::new(dao());

        let mut first = TrustedRemoteRegistry::new();
        first.set_trusted_remote(&gov, &dao(), 7, endpoint("a")).unwrap();
        first.set_trusted_remote(&gov, &dao(), 9, endpoint("b")).unwrap();
        first.set_trusted_remote(&gov, &dao(), 7, endpoint("a")).unwrap();

        let mut second = TrustedRemoteRegistry::new();
        second.set_trusted_remote(&gov, &dao(), 9, endpoint("b")).unwrap();
        second.set_trusted_remote(&gov, &dao(), 7, endpoint("a")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrite_replaces_previous_pair() {
        let gov = Governance::new(dao());
        let mut registry = TrustedRemoteRegistry::new();
        registry.set_trusted_remote(&gov, &dao(), 7, endpoint("a")).unwrap();
        registry.set_trusted_remote(&gov, &dao(), 7, endpoint("b")).unwrap();
        assert!(!registry.validate_inbound(7, &endpoint("a")));
        assert!(registry.validate_inbound(7, &endpoint("b")));
    }
}
