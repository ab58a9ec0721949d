// crates/ferry-core/src/governance.rs
//
// Two-step governance authority for a single governed contract.
//
// Valid transitions:
//   authority --propose(new)--> pending = new
//   pending   --accept()-----> authority = pending, pending = None
//
// A proposal can be replaced by another proposal before it is accepted.

use serde::{Deserialize, Serialize};

use crate::error::FerryError;
use crate::types::Address;

/// Governance state of one contract: the current authority and an optional
/// pending successor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governance {
    authority: Address,
    pending: Option<Address>,
}

impl Governance {
    /// Create governance owned by `authority` with no pending transfer.
    pub fn new(authority: Address) -> Self {
        Self {
            authority,
            pending: None,
        }
    }

    /// The current governance authority.
    pub fn authority(&self) -> Address {
        self.authority
    }

    /// The proposed successor, if any.
    pub fn pending(&self) -> Option<Address> {
        self.pending
    }

    /// Fail with `Unauthorized` unless `caller` is the current authority.
    pub fn ensure_authority(&self, caller: &Address) -> Result<(), FerryError> {
        if *caller != self.authority {
            return Err(FerryError::Unauthorized(format!(
                "{} is not the governance authority",
                caller
            )));
        }
        Ok(())
    }

    /// Propose a new authority. Only the current authority may propose.
    pub fn propose(&mut self, caller: &Address, successor: Address) -> Result<(), FerryError> {
        self.ensure_authority(caller)?;
        if successor.is_zero() {
            return Err(FerryError::Unauthorized(
                "cannot propose the zero address as authority".to_string(),
            ));
        }
        tracing::info!("Governance transfer proposed: {} -> {}", self.authority, successor);
        self.pending = Some(successor);
        Ok(())
    }

    /// Accept a pending proposal. Only the proposed successor may accept.
    pub fn accept(&mut self, caller: &Address) -> Result<(), FerryError> {
        match self.pending {
            Some(pending) if pending == *caller => {
                tracing::info!("Governance transfer accepted: {} -> {}", self.authority, pending);
                self.authority = pending;
                self.pending = None;
                Ok(())
            }
            _ => Err(FerryError::Unauthorized(format!(
                "{} is not the pending authority",
                caller
            ))),
        }
    }
}
