// crates/ferry-coordinator/src/satellite.rs
//
// Satellite coordinator.
//
// Holds the emission rate last broadcast by the canonical coordinator and the
// revenue custody owed to the canonical chain. Custody leaves only through
// `settle_to_canonical`, and only to the registered bridge delegate.

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::governance::Governance;
use ferry_core::message::{Envelope, MessageId, Payload};
use ferry_core::outbox::Outbox;
use ferry_core::remote::{RemoteEndpoint, TrustedRemoteRegistry};
use ferry_core::traits::InboundOutcome;
use ferry_core::types::{Address, Amount, ChainId};
use ferry_economics::emission::apply_rate;
use ferry_economics::token::TokenLedger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteCoordinator {
    address: Address,
    chain_id: ChainId,
    canonical_chain_id: ChainId,
    governance: Governance,
    remotes: TrustedRemoteRegistry,
    emission_rate: Amount,
    bridge_delegate: Option<Address>,
    /// The fee splitter allowed to report debt and pay out emission.
    splitter: Address,
}

impl SatelliteCoordinator {
    pub fn new(
        address: Address,
        chain_id: ChainId,
        canonical_chain_id: ChainId,
        authority: Address,
        splitter: Address,
    ) -> Self {
        Self {
            address,
            chain_id,
            canonical_chain_id,
            governance: Governance::new(authority),
            remotes: TrustedRemoteRegistry::new(),
            emission_rate: 0,
            bridge_delegate: None,
            splitter,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn canonical_chain_id(&self) -> ChainId {
        self.canonical_chain_id
    }

    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    pub fn governance_mut(&mut self) -> &mut Governance {
        &mut self.governance
    }

    pub fn remotes(&self) -> &TrustedRemoteRegistry {
        &self.remotes
    }

    /// Current emission rate, scaled by `RATE_SCALE`. Zero until the first
    /// distribution reaches this chain.
    pub fn emission_rate(&self) -> Amount {
        self.emission_rate
    }

    pub fn bridge_delegate(&self) -> Option<Address> {
        self.bridge_delegate
    }

    pub fn splitter(&self) -> Address {
        self.splitter
    }

    /// Revenue held for the canonical chain.
    pub fn custody(&self, revenue: &TokenLedger) -> Amount {
        revenue.balance_of(&self.address)
    }

    pub fn set_trusted_remote(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        endpoint: RemoteEndpoint,
    ) -> Result<(), FerryError> {
        self.remotes
            .set_trusted_remote(&self.governance, caller, chain_id, endpoint)
    }

    /// Set the one account allowed to pull revenue custody. Governance only.
    pub fn set_bridge_delegate(
        &mut self,
        caller: &Address,
        delegate: Address,
    ) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        tracing::info!(
            "Satellite coordinator {} bridge delegate set to {}",
            self.chain_id,
            delegate
        );
        self.bridge_delegate = Some(delegate);
        Ok(())
    }

    /// Replace the fee splitter. Governance only.
    pub fn set_splitter(&mut self, caller: &Address, splitter: Address) -> Result<(), FerryError> {
        self.governance.ensure_authority(caller)?;
        self.splitter = splitter;
        Ok(())
    }

    pub fn ensure_splitter(&self, caller: &Address) -> Result<(), FerryError> {
        if *caller != self.splitter {
            return Err(FerryError::Unauthorized(format!(
                "{} is not the fee splitter of chain {}",
                caller, self.chain_id
            )));
        }
        Ok(())
    }

    /// Native fee for a debt-increase message.
    ///
    /// # Errors
    /// `UntrustedDestination` if the canonical coordinator is not registered.
    pub fn quote_debt_increase(&self, outbox: &Outbox, amount: Amount) -> Result<Amount, FerryError> {
        self.remotes.require(self.canonical_chain_id)?;
        Ok(outbox.quote(&Payload::DebtIncrease {
            chain_id: self.chain_id,
            amount,
        }))
    }

    /// Tell the canonical coordinator that `amount` more revenue is owed.
    /// Splitter only.
    pub fn notify_debt(
        &self,
        caller: &Address,
        outbox: &mut Outbox,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        self.ensure_splitter(caller)?;
        let endpoint = *self.remotes.require(self.canonical_chain_id)?;
        let payload = Payload::DebtIncrease {
            chain_id: self.chain_id,
            amount,
        };
        outbox.enqueue(self.canonical_chain_id, &endpoint, &payload, fee)
    }

    /// Pay `to` the governance token earned by `revenue_amount` of revenue at
    /// the current rate, out of this coordinator's wrapped balance. Splitter only.
    ///
    /// # Errors
    /// `InsufficientCustody` if the coordinator holds less wrapped token than owed.
    pub fn mint(
        &self,
        wrapped: &mut TokenLedger,
        caller: &Address,
        to: &Address,
        revenue_amount: Amount,
    ) -> Result<Amount, FerryError> {
        self.ensure_splitter(caller)?;
        let amount = apply_rate(revenue_amount, self.emission_rate);
        if amount == 0 {
            return Ok(0);
        }
        let available = wrapped.balance_of(&self.address);
        if available < amount {
            return Err(FerryError::InsufficientCustody {
                requested: amount,
                available,
            });
        }
        wrapped.transfer(&self.address, to, amount)?;
        tracing::debug!("Paid {} emission to {}", wrapped.display(amount), to);
        Ok(amount)
    }

    /// Move `amount` of revenue custody to the bridge delegate, who carries it
    /// to the canonical chain.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the registered bridge delegate
    /// - `ZeroAmount` if `amount` is 0
    /// - `InsufficientCustody` if custody is below `amount`
    pub fn settle_to_canonical(
        &self,
        revenue: &mut TokenLedger,
        caller: &Address,
        amount: Amount,
    ) -> Result<(), FerryError> {
        match self.bridge_delegate {
            Some(delegate) if delegate == *caller => {}
            _ => {
                return Err(FerryError::Unauthorized(format!(
                    "{} is not the bridge delegate of chain {}",
                    caller, self.chain_id
                )))
            }
        }
        if amount == 0 {
            return Err(FerryError::ZeroAmount("settle to canonical".to_string()));
        }
        let available = self.custody(revenue);
        if available < amount {
            return Err(FerryError::InsufficientCustody {
                requested: amount,
                available,
            });
        }
        revenue.transfer(&self.address, caller, amount)?;
        tracing::info!(
            "Chain {} released {} of custody to delegate {}",
            self.chain_id,
            revenue.display(amount),
            caller
        );
        Ok(())
    }

    /// Handle a message addressed to this coordinator. Only rate updates from
    /// the canonical coordinator are accepted.
    pub fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome {
        if !self
            .remotes
            .validate_inbound(envelope.src_chain, &envelope.sender_pair())
        {
            tracing::warn!(
                "Satellite coordinator {} dropped unauthenticated message {} from chain {}",
                self.chain_id,
                envelope.id,
                envelope.src_chain
            );
            return InboundOutcome::Dropped(
                FerryError::Unauthenticated {
                    chain_id: envelope.src_chain,
                }
                .to_string(),
            );
        }

        match envelope.decode_payload() {
            Ok(Payload::RateUpdate { rate }) => {
                tracing::info!(
                    "Chain {} emission rate {} -> {}",
                    self.chain_id,
                    self.emission_rate,
                    rate
                );
                self.emission_rate = rate;
                InboundOutcome::Applied
            }
            Ok(other) => InboundOutcome::Dropped(format!(
                "satellite coordinator does not accept {} messages",
                other.kind()
            )),
            Err(e) => InboundOutcome::Dropped(e.to_string()),
        }
    }
}
