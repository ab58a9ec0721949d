// crates/ferry-core/src/outbox.rs
//
// Outbound half of the relay adapter for one chain.
//
// Contracts call `quote` and `enqueue`; the relay drains the queue. The fee is
// checked synchronously so a shortfall aborts the calling transition before
// it has touched any state.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::FerryError;
use crate::message::{Envelope, MessageId, Payload};
use crate::remote::RemoteEndpoint;
use crate::types::{Amount, ChainId};

/// Native fee charged by the relay per message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat fee per message.
    pub base_fee: Amount,
    /// Additional fee per payload byte.
    pub per_byte_fee: Amount,
}

impl FeeSchedule {
    pub fn quote_len(&self, payload_len: usize) -> Amount {
        self.base_fee
            .saturating_add(self.per_byte_fee.saturating_mul(payload_len as Amount))
    }
}

/// Fail with `InsufficientMessageFee` if `attached < required`.
pub fn ensure_fee(attached: Amount, required: Amount) -> Result<(), FerryError> {
    if attached < required {
        return Err(FerryError::InsufficientMessageFee { attached, required });
    }
    Ok(())
}

/// Queue of messages emitted by contracts on one chain, waiting for the relay.
#[derive(Debug, Clone)]
pub struct Outbox {
    chain_id: ChainId,
    fee_schedule: FeeSchedule,
    next_nonce: u64,
    pending: VecDeque<Envelope>,
    fees_collected: Amount,
}

impl Outbox {
    pub fn new(chain_id: ChainId, fee_schedule: FeeSchedule) -> Self {
        Self {
            chain_id,
            fee_schedule,
            next_nonce: 0,
            pending: VecDeque::new(),
            fees_collected: 0,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Native fee required to send `payload`.
    pub fn quote(&self, payload: &Payload) -> Amount {
        self.fee_schedule.quote_len(payload.encode().len())
    }

    /// Enqueue `payload` for `dst_chain` over the path described by `endpoint`.
    ///
    /// The envelope's sender is `endpoint.local` and its receiver is
    /// `endpoint.remote`. Returns the relay message id.
    ///
    /// # Errors
    /// Returns `FerryError::InsufficientMessageFee` if `fee` is below the quote.
    pub fn enqueue(
        &mut self,
        dst_chain: ChainId,
        endpoint: &RemoteEndpoint,
        payload: &Payload,
        fee: Amount,
    ) -> Result<MessageId, FerryError> {
        let bytes = payload.encode();
        ensure_fee(fee, self.fee_schedule.quote_len(bytes.len()))?;

        let envelope = Envelope::new(
            self.chain_id,
            dst_chain,
            self.next_nonce,
            endpoint.local,
            endpoint.remote,
            bytes,
        );
        let id = envelope.id;
        tracing::debug!(
            "Outbox {} enqueued {} #{} -> chain {} ({})",
            self.chain_id,
            payload.kind(),
            self.next_nonce,
            dst_chain,
            id
        );

        self.next_nonce += 1;
        self.fees_collected = self.fees_collected.saturating_add(fee);
        self.pending.push_back(envelope);
        Ok(id)
    }

    /// Remove and return every pending envelope in enqueue order.
    pub fn drain(&mut self) -> Vec<Envelope> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Envelope> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total native fee paid into the relay from this chain.
    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }
}
