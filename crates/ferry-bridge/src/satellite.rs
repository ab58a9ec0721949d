// crates/ferry-bridge/src/satellite.rs
//
// Satellite side of the token bridge pair: the wrapped governance token.
//
// Wrapped supply only changes through this contract: it mints on an
// authenticated inbound transfer and burns on an outbound transfer or lock.

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::governance::Governance;
use ferry_core::message::{Envelope, MessageId, Payload};
use ferry_core::outbox::{ensure_fee, Outbox};
use ferry_core::remote::{RemoteEndpoint, TrustedRemoteRegistry};
use ferry_core::traits::InboundOutcome;
use ferry_core::types::{Address, Amount, ChainId};
use ferry_economics::token::TokenLedger;

/// Mint/burn bridge owning the wrapped governance token ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteBridge {
    address: Address,
    chain_id: ChainId,
    canonical_chain_id: ChainId,
    governance: Governance,
    remotes: TrustedRemoteRegistry,
    wrapped: TokenLedger,
}

impl SatelliteBridge {
    pub fn new(
        address: Address,
        chain_id: ChainId,
        canonical_chain_id: ChainId,
        authority: Address,
        symbol: &str,
    ) -> Self {
        Self {
            address,
            chain_id,
            canonical_chain_id,
            governance: Governance::new(authority),
            remotes: TrustedRemoteRegistry::new(),
            wrapped: TokenLedger::new(symbol),
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

    pub fn set_trusted_remote(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        endpoint: RemoteEndpoint,
    ) -> Result<(), FerryError> {
        self.remotes
            .set_trusted_remote(&self.governance, caller, chain_id, endpoint)
    }

    /// The wrapped token ledger.
    pub fn wrapped(&self) -> &TokenLedger {
        &self.wrapped
    }

    /// Mutable access for local transfers (burns and mints go through the bridge).
    pub fn wrapped_mut(&mut self) -> &mut TokenLedger {
        &mut self.wrapped
    }

    pub fn quote_send(&self, outbox: &Outbox, to: Address, amount: Amount) -> Amount {
        outbox.quote(&Payload::TokenTransfer { to, amount })
    }

    /// Burn `amount` from `from` and send it to `to` on `dst`.
    ///
    /// # Errors
    /// `ZeroAmount`, `UntrustedDestination`, `InsufficientMessageFee`, or
    /// `InsufficientBalance`; on any error nothing is burned or sent.
    pub fn send(
        &mut self,
        outbox: &mut Outbox,
        from: &Address,
        dst: ChainId,
        to: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        self.burn_and_send(outbox, from, dst, Payload::TokenTransfer { to, amount }, amount, fee)
    }

    /// Burn `amount` from `account` and ask the canonical bridge to lock the
    /// same amount of custody into vote escrow for `account`.
    pub fn lock(
        &mut self,
        outbox: &mut Outbox,
        account: &Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        let payload = Payload::Lock {
            account: *account,
            amount,
        };
        let canonical = self.canonical_chain_id;
        self.burn_and_send(outbox, account, canonical, payload, amount, fee)
    }

    fn burn_and_send(
        &mut self,
        outbox: &mut Outbox,
        from: &Address,
        dst: ChainId,
        payload: Payload,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        if amount == 0 {
            return Err(FerryError::ZeroAmount(format!("bridge {}", payload.kind())));
        }
        let endpoint = *self.remotes.require(dst)?;
        ensure_fee(fee, outbox.quote(&payload))?;
        self.wrapped.ensure_balance(from, amount)?;

        self.wrapped.burn(from, amount)?;
        let id = outbox.enqueue(dst, &endpoint, &payload, fee)?;
        tracing::info!(
            "Burned {} from {} for {} to chain {} ({})",
            self.wrapped.display(amount),
            from,
            payload.kind(),
            dst,
            id
        );
        Ok(id)
    }

    /// Handle a message addressed to this bridge.
    pub fn handle_inbound(&mut self, envelope: &Envelope) -> InboundOutcome {
        if !self
            .remotes
            .validate_inbound(envelope.src_chain, &envelope.sender_pair())
        {
            tracing::warn!(
                "Wrapped bridge on chain {} dropped unauthenticated message {} from chain {}",
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
            Ok(Payload::TokenTransfer { to, amount }) => match self.wrapped.mint(&to, amount) {
                Ok(()) => {
                    tracing::info!(
                        "Minted {} to {} on chain {}",
                        self.wrapped.display(amount),
                        to,
                        self.chain_id
                    );
                    InboundOutcome::Applied
                }
                Err(e) => InboundOutcome::Dropped(e.to_string()),
            },
            Ok(other) => InboundOutcome::Dropped(format!(
                "wrapped bridge does not accept {} messages",
                other.kind()
            )),
            Err(e) => {
                tracing::warn!("Wrapped bridge dropped malformed message {}: {}", envelope.id, e);
                InboundOutcome::Dropped(e.to_string())
            }
        }
    }
}
