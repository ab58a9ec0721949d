// crates/ferry-core/src/message.rs
//
// Wire payloads and the relay envelope.
//
// Payload format (big-endian, one-byte tag first):
//   0x01 TokenTransfer : to [20] | amount u128 [16]        = 37 bytes
//   0x02 Lock          : account [20] | amount u128 [16]   = 37 bytes
//   0x03 DebtIncrease  : chain_id u16 [2] | amount u128 [16] = 19 bytes
//   0x04 RateUpdate    : rate u128 [16]                     = 17 bytes
//
// Trailing bytes are rejected so that a payload has exactly one encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::FerryError;
use crate::remote::RemoteEndpoint;
use crate::types::{Address, Amount, ChainId};

const TAG_TOKEN_TRANSFER: u8 = 0x01;
const TAG_LOCK: u8 = 0x02;
const TAG_DEBT_INCREASE: u8 = 0x03;
const TAG_RATE_UPDATE: u8 = 0x04;

/// A cross-chain message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Bridge leg: release (canonical) or mint (satellite) `amount` to `to`.
    TokenTransfer { to: Address, amount: Amount },
    /// Satellite-originated lock: move `amount` of custody into vote escrow for `account`.
    Lock { account: Address, amount: Amount },
    /// Satellite fee debt grew by `amount`.
    DebtIncrease { chain_id: ChainId, amount: Amount },
    /// New emission rate, scaled by `RATE_SCALE`.
    RateUpdate { rate: Amount },
}

impl Payload {
    /// Encode to the wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(37);
        match self {
            Payload::TokenTransfer { to, amount } => {
                buf.push(TAG_TOKEN_TRANSFER);
                buf.extend_from_slice(to.as_bytes());
                buf.extend_from_slice(&amount.to_be_bytes());
            }
            Payload::Lock { account, amount } => {
                buf.push(TAG_LOCK);
                buf.extend_from_slice(account.as_bytes());
                buf.extend_from_slice(&amount.to_be_bytes());
            }
            Payload::DebtIncrease { chain_id, amount } => {
                buf.push(TAG_DEBT_INCREASE);
                buf.extend_from_slice(&chain_id.to_be_bytes());
                buf.extend_from_slice(&amount.to_be_bytes());
            }
            Payload::RateUpdate { rate } => {
                buf.push(TAG_RATE_UPDATE);
                buf.extend_from_slice(&rate.to_be_bytes());
            }
        }
        buf
    }

    /// Decode from the wire format.
    ///
    /// # Errors
    /// Returns `FerryError::Codec` on an empty buffer, an unknown tag, or a
    /// body whose length does not match the tag.
    pub fn decode(data: &[u8]) -> Result<Self, FerryError> {
        let (tag, body) = data
            .split_first()
            .ok_or_else(|| FerryError::Codec("empty payload".to_string()))?;

        match *tag {
            TAG_TOKEN_TRANSFER => {
                expect_len(body, 36, "TokenTransfer")?;
                Ok(Payload::TokenTransfer {
                    to: read_address(&body[..20]),
                    amount: read_u128(&body[20..36]),
                })
            }
            TAG_LOCK => {
                expect_len(body, 36, "Lock")?;
                Ok(Payload::Lock {
                    account: read_address(&body[..20]),
                    amount: read_u128(&body[20..36]),
                })
            }
            TAG_DEBT_INCREASE => {
                expect_len(body, 18, "DebtIncrease")?;
                Ok(Payload::DebtIncrease {
                    chain_id: u16::from_be_bytes([body[0], body[1]]),
                    amount: read_u128(&body[2..18]),
                })
            }
            TAG_RATE_UPDATE => {
                expect_len(body, 16, "RateUpdate")?;
                Ok(Payload::RateUpdate {
                    rate: read_u128(&body[..16]),
                })
            }
            other => Err(FerryError::Codec(format!("unknown payload tag 0x{:02x}", other))),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::TokenTransfer { .. } => "TokenTransfer",
            Payload::Lock { .. } => "Lock",
            Payload::DebtIncrease { .. } => "DebtIncrease",
            Payload::RateUpdate { .. } => "RateUpdate",
        }
    }
}

fn expect_len(body: &[u8], expected: usize, kind: &str) -> Result<(), FerryError> {
    if body.len() != expected {
        return Err(FerryError::Codec(format!(
            "{} body must be {} bytes, got {}",
            kind,
            expected,
            body.len()
        )));
    }
    Ok(())
}

fn read_address(bytes: &[u8]) -> Address {
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    Address(out)
}

fn read_u128(bytes: &[u8]) -> u128 {
    let mut out = [0u8; 16];
    out.copy_from_slice(bytes);
    u128::from_be_bytes(out)
}

/// Relay-assigned message identifier: SHA-256 over the envelope header and payload.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub [u8; 32]);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self)
    }
}

/// A message in flight between two chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub src_chain: ChainId,
    pub dst_chain: ChainId,
    /// Per-source-chain sequence number.
    pub nonce: u64,
    /// Sending contract on the source chain.
    pub sender: Address,
    /// Receiving contract on the destination chain.
    pub receiver: Address,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(
        src_chain: ChainId,
        dst_chain: ChainId,
        nonce: u64,
        sender: Address,
        receiver: Address,
        payload: Vec<u8>,
    ) -> Self {
        let id = Self::compute_id(src_chain, dst_chain, nonce, &sender, &receiver, &payload);
        Self {
            id,
            src_chain,
            dst_chain,
            nonce,
            sender,
            receiver,
            payload,
        }
    }

    fn compute_id(
        src_chain: ChainId,
        dst_chain: ChainId,
        nonce: u64,
        sender: &Address,
        receiver: &Address,
        payload: &[u8],
    ) -> MessageId {
        let mut hasher = Sha256::new();
        hasher.update(src_chain.to_be_bytes());
        hasher.update(dst_chain.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        hasher.update(sender.as_bytes());
        hasher.update(receiver.as_bytes());
        hasher.update(payload);
        MessageId(hasher.finalize().into())
    }

    /// The (remote, local) pair as seen by the receiving contract.
    pub fn sender_pair(&self) -> RemoteEndpoint {
        RemoteEndpoint {
            remote: self.sender,
            local: self.receiver,
        }
    }

    pub fn decode_payload(&self) -> Result<Payload, FerryError> {
        Payload::decode(&self.payload)
    }
}
