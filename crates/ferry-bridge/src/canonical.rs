// crates/ferry-bridge/src/canonical.rs
//
// Canonical side of the token bridge pair.
//
// Outbound transfers lock the governance token in this contract's custody;
// inbound transfers release it. Custody therefore always equals the wrapped
// supply outstanding on all satellites once no transfer is in flight.

use serde::{Deserialize, Serialize};

use ferry_core::error::FerryError;
use ferry_core::governance::Governance;
use ferry_core::message::{Envelope, MessageId, Payload};
use ferry_core::outbox::{ensure_fee, Outbox};
use ferry_core::remote::{RemoteEndpoint, TrustedRemoteRegistry};
use ferry_core::traits::{InboundOutcome, VoteEscrow};
use ferry_core::types::{Address, Amount, ChainId};
use ferry_economics::token::TokenLedger;

/// Lock/release bridge for the canonical governance token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalBridge {
    address: Address,
    chain_id: ChainId,
    governance: Governance,
    remotes: TrustedRemoteRegistry,
}

impl CanonicalBridge {
    pub fn new(address: Address, chain_id: ChainId, authority: Address) -> Self {
        Self {
            address,
            chain_id,
            governance: Governance::new(authority),
            remotes: TrustedRemoteRegistry::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
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

    /// Register the satellite bridge for `chain_id`. Governance only.
    pub fn set_trusted_remote(
        &mut self,
        caller: &Address,
        chain_id: ChainId,
        endpoint: RemoteEndpoint,
    ) -> Result<(), FerryError> {
        self.remotes
            .set_trusted_remote(&self.governance, caller, chain_id, endpoint)
    }

    /// Governance token locked in this bridge.
    pub fn custody(&self, token: &TokenLedger) -> Amount {
        token.balance_of(&self.address)
    }

    /// Native fee for bridging to a satellite.
    pub fn quote_send(&self, outbox: &Outbox, to: Address, amount: Amount) -> Amount {
        outbox.quote(&Payload::TokenTransfer { to, amount })
    }

    /// Lock `amount` from `from` and send it to `to` on `dst`.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is 0
    /// - `UntrustedDestination` if no satellite bridge is registered for `dst`
    /// - `InsufficientMessageFee` if `fee` is below the quote
    /// - `InsufficientBalance` if `from` cannot cover `amount`
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        token: &mut TokenLedger,
        outbox: &mut Outbox,
        from: &Address,
        dst: ChainId,
        to: Address,
        amount: Amount,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        if amount == 0 {
            return Err(FerryError::ZeroAmount("bridge send".to_string()));
        }
        let endpoint = *self.remotes.require(dst)?;
        let payload = Payload::TokenTransfer { to, amount };
        ensure_fee(fee, outbox.quote(&payload))?;
        token.ensure_balance(from, amount)?;

        token.transfer(from, &self.address, amount)?;
        let id = outbox.enqueue(dst, &endpoint, &payload, fee)?;
        tracing::info!(
            "Locked {} from {} for chain {} recipient {} ({})",
            token.display(amount),
            from,
            dst,
            to,
            id
        );
        Ok(id)
    }

    /// Lock `amount` of `account`'s governance token into vote escrow.
    ///
    /// Local only; nothing crosses the relay.
    pub fn lock(
        &self,
        token: &mut TokenLedger,
        escrow: &mut dyn VoteEscrow,
        account: &Address,
        amount: Amount,
    ) -> Result<(), FerryError> {
        if amount == 0 {
            return Err(FerryError::ZeroAmount("lock".to_string()));
        }
        token.transfer(account, &escrow.address(), amount)?;
        escrow.lock(account, amount);
        tracing::info!("Locked {} for {} in vote escrow", token.display(amount), account);
        Ok(())
    }

    /// Handle a message addressed to this bridge.
    pub fn handle_inbound(
        &self,
        token: &mut TokenLedger,
        escrow: &mut dyn VoteEscrow,
        envelope: &Envelope,
    ) -> InboundOutcome {
        if !self
            .remotes
            .validate_inbound(envelope.src_chain, &envelope.sender_pair())
        {
            tracing::warn!(
                "Bridge dropped unauthenticated message {} from chain {} sender {}",
                envelope.id,
                envelope.src_chain,
                envelope.sender
            );
            return InboundOutcome::Dropped(
                FerryError::Unauthenticated {
                    chain_id: envelope.src_chain,
                }
                .to_string(),
            );
        }

        let payload = match envelope.decode_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Bridge dropped malformed message {}: {}", envelope.id, e);
                return InboundOutcome::Dropped(e.to_string());
            }
        };

        let result = match payload {
            Payload::TokenTransfer { to, amount } => token
                .transfer(&self.address, &to, amount)
                .map(|_| {
                    tracing::info!(
                        "Released {} to {} from chain {}",
                        token.display(amount),
                        to,
                        envelope.src_chain
                    );
                }),
            Payload::Lock { account, amount } => token
                .transfer(&self.address, &escrow.address(), amount)
                .map(|_| {
                    escrow.lock(&account, amount);
                    tracing::info!(
                        "Locked {} for {} on behalf of chain {}",
                        token.display(amount),
                        account,
                        envelope.src_chain
                    );
                }),
            other => {
                return InboundOutcome::Dropped(format!(
                    "bridge does not accept {} messages",
                    other.kind()
                ))
            }
        };

        match result {
            Ok(()) => InboundOutcome::Applied,
            Err(e) => {
                // Custody shorter than an authenticated release means the
                // conservation invariant is already broken upstream.
                tracing::error!("Bridge could not apply message {}: {}", envelope.id, e);
                InboundOutcome::Dropped(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::outbox::FeeSchedule;

    const L1: ChainId = 101;
    const L2: ChainId = 110;

    struct Escrow {
        address: Address,
        locked: Vec<(Address, Amount)>,
    }

    impl VoteEscrow for Escrow {
        fn address(&self) -> Address {
            self.address
        }

        fn lock(&mut self, account: &Address, amount: Amount) {
            self.locked.push((*account, amount));
        }
    }

    fn dao() -> Address {
        Address::derive("dao")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn satellite_bridge() -> Address {
        Address::derive("l2/bridge")
    }

    fn escrow() -> Escrow {
        Escrow {
            address: Address::derive("locker"),
            locked: Vec::new(),
        }
    }

    fn setup() -> (CanonicalBridge, TokenLedger, Outbox) {
        let mut bridge = CanonicalBridge::new(Address::derive("l1/bridge"), L1, dao());
        let endpoint = RemoteEndpoint {
            remote: satellite_bridge(),
            local: bridge.address(),
        };
        bridge.set_trusted_remote(&dao(), L2, endpoint).unwrap();
        let mut token = TokenLedger::new("AURA");
        token.mint(&alice(), 1_000).unwrap();
        (bridge, token, Outbox::new(L1, FeeSchedule::default()))
    }

    fn inbound(bridge: &CanonicalBridge, sender: Address, payload: Payload) -> Envelope {
        Envelope::new(L2, L1, 0, sender, bridge.address(), payload.encode())
    }

    #[test]
    fn test_send_locks_into_custody() {
        let (bridge, mut token, mut outbox) = setup();
        bridge
            .send(&mut token, &mut outbox, &alice(), L2, alice(), 400, 0)
            .unwrap();

        assert_eq!(token.balance_of(&alice()), 600);
        assert_eq!(bridge.custody(&token), 400);
        assert_eq!(token.total_supply(), 1_000);

        let sent = outbox.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].receiver, satellite_bridge());
        assert_eq!(
            sent[0].decode_payload().unwrap(),
            Payload::TokenTransfer { to: alice(), amount: 400 }
        );
    }

    #[test]
    fn test_send_untrusted_destination() {
        let (bridge, mut token, mut outbox) = setup();
        let result = bridge.send(&mut token, &mut outbox, &alice(), 999, alice(), 1, 0);
        assert!(matches!(result, Err(FerryError::UntrustedDestination(999))));
        assert_eq!(token.balance_of(&alice()), 1_000);
        assert_eq!(outbox.pending_len(), 0);
    }

    #[test]
    fn test_send_insufficient_balance() {
        let (bridge, mut token, mut outbox) = setup();
        let result = bridge.send(&mut token, &mut outbox, &alice(), L2, alice(), 1_001, 0);
        assert!(matches!(result, Err(FerryError::InsufficientBalance { .. })));
        assert_eq!(bridge.custody(&token), 0);
        assert_eq!(outbox.pending_len(), 0);
    }

    #[test]
    fn test_send_fee_shortfall_moves_nothing() {
        let (bridge, mut token, _) = setup();
        let mut outbox = Outbox::new(L1, FeeSchedule { base_fee: 10, per_byte_fee: 0 });
        let result = bridge.send(&mut token, &mut outbox, &alice(), L2, alice(), 5, 9);
        assert!(matches!(result, Err(FerryError::InsufficientMessageFee { .. })));
        assert_eq!(token.balance_of(&alice()), 1_000);
    }

    #[test]
    fn test_inbound_release() {
        let (bridge, mut token, mut outbox) = setup();
        let mut escrow = escrow();
        bridge
            .send(&mut token, &mut outbox, &alice(), L2, alice(), 400, 0)
            .unwrap();

        let bob = Address::derive("bob");
        let env = inbound(&bridge, satellite_bridge(), Payload::TokenTransfer { to: bob, amount: 150 });
        assert!(bridge.handle_inbound(&mut token, &mut escrow, &env).is_applied());
        assert_eq!(token.balance_of(&bob), 150);
        assert_eq!(bridge.custody(&token), 250);
    }

    #[test]
    fn test_inbound_forged_sender_is_dropped() {
        let (bridge, mut token, mut outbox) = setup();
        let mut escrow = escrow();
        bridge
            .send(&mut token, &mut outbox, &alice(), L2, alice(), 400, 0)
            .unwrap();
        let before = token.clone();

        let env = inbound(
            &bridge,
            Address::derive("mallory"),
            Payload::TokenTransfer { to: alice(), amount: 400 },
        );
        let outcome = bridge.handle_inbound(&mut token, &mut escrow, &env);
        assert!(!outcome.is_applied());
        assert_eq!(token, before);
    }

    #[test]
    fn test_local_lock_into_escrow() {
        let (bridge, mut token, _) = setup();
        let mut escrow = escrow();
        bridge.lock(&mut token, &mut escrow, &alice(), 300).unwrap();
        assert_eq!(token.balance_of(&escrow.address()), 300);
        assert_eq!(escrow.locked, vec![(alice(), 300)]);
        assert!(bridge.lock(&mut token, &mut escrow, &alice(), 0).is_err());
    }

    #[test]
    fn test_inbound_lock_moves_custody_to_escrow() {
        let (bridge, mut token, mut outbox) = setup();
        let mut escrow = escrow();
        bridge
            .send(&mut token, &mut outbox, &alice(), L2, alice(), 400, 0)
            .unwrap();

        let env = inbound(&bridge, satellite_bridge(), Payload::Lock { account: alice(), amount: 100 });
        assert!(bridge.handle_inbound(&mut token, &mut escrow, &env).is_applied());
        assert_eq!(bridge.custody(&token), 300);
        assert_eq!(token.balance_of(&escrow.address()), 100);
        assert_eq!(escrow.locked, vec![(alice(), 100)]);
    }

    #[test]
    fn test_inbound_wrong_payload_kind() {
        let (bridge, mut token, _) = setup();
        let mut escrow = escrow();
        let env = inbound(&bridge, satellite_bridge(), Payload::RateUpdate { rate: 1 });
        assert!(!bridge.handle_inbound(&mut token, &mut escrow, &env).is_applied());
    }
}
