// crates/ferry-relay/src/relay.rs
//
// In-memory messaging relay.
//
// Envelopes are collected from each chain's outbox into one FIFO queue per
// (source, destination) path and delivered in order along that path. Every
// message id is delivered at most once; a replayed envelope is discarded
// before it reaches the destination chain.
//
// Delivered ids are remembered in a bounded window (oldest evicted first), so
// a long-running relay keeps constant memory. A replay older than the window
// is no longer recognised.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use ferry_core::message::{Envelope, MessageId};
use ferry_core::traits::{InboundHandler, InboundOutcome};
use ferry_core::types::ChainId;

/// Result of delivering one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub id: MessageId,
    pub src_chain: ChainId,
    pub dst_chain: ChainId,
    pub outcome: InboundOutcome,
}

/// Running relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    pub collected: u64,
    pub applied: u64,
    pub dropped: u64,
    /// Envelopes discarded because their id had already been delivered.
    pub duplicates: u64,
}

/// Number of delivered message ids remembered for replay detection.
pub const DEDUP_WINDOW: usize = 65_536;

#[derive(Debug)]
pub struct MemoryRelay {
    queues: BTreeMap<(ChainId, ChainId), VecDeque<Envelope>>,
    delivered: HashSet<MessageId>,
    delivery_order: VecDeque<MessageId>,
    window: usize,
    stats: RelayStats,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::with_window(DEDUP_WINDOW)
    }
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A relay remembering the last `window` delivered ids (at least one).
    pub fn with_window(window: usize) -> Self {
        Self {
            queues: BTreeMap::new(),
            delivered: HashSet::new(),
            delivery_order: VecDeque::new(),
            window: window.max(1),
            stats: RelayStats::default(),
        }
    }

    fn mark_delivered(&mut self, id: MessageId) {
        if !self.delivered.insert(id) {
            return;
        }
        self.delivery_order.push_back(id);
        while self.delivery_order.len() > self.window {
            if let Some(oldest) = self.delivery_order.pop_front() {
                self.delivered.remove(&oldest);
            }
        }
    }

    /// Move everything pending in `chain`'s outbox onto the relay.
    pub fn collect(&mut self, chain: &mut dyn InboundHandler) -> usize {
        let envelopes = chain.outbox_mut().drain();
        let count = envelopes.len();
        for envelope in envelopes {
            self.inject(envelope);
        }
        if count > 0 {
            tracing::debug!("Relay collected {} messages from chain {}", count, chain.chain_id());
        }
        count
    }

    /// Put an envelope on its path as-is. Used for replays and forged traffic.
    pub fn inject(&mut self, envelope: Envelope) {
        self.stats.collected += 1;
        self.queues
            .entry((envelope.src_chain, envelope.dst_chain))
            .or_default()
            .push_back(envelope);
    }

    /// Pop the next undelivered envelope on `src -> dst`, discarding replays.
    pub fn pop_next(&mut self, src: ChainId, dst: ChainId) -> Option<Envelope> {
        let queue = self.queues.get_mut(&(src, dst))?;
        while let Some(envelope) = queue.pop_front() {
            if self.delivered.contains(&envelope.id) {
                tracing::debug!("Relay discarded replay of {}", envelope.id);
                self.stats.duplicates += 1;
                continue;
            }
            return Some(envelope);
        }
        None
    }

    /// Hand `envelope` to `target` and record it as delivered.
    pub fn deliver(&mut self, envelope: Envelope, target: &mut dyn InboundHandler) -> DeliveryReport {
        self.mark_delivered(envelope.id);
        let outcome = target.handle_inbound(&envelope);
        match &outcome {
            InboundOutcome::Applied => self.stats.applied += 1,
            InboundOutcome::Dropped(reason) => {
                tracing::debug!("Message {} dropped by chain {}: {}", envelope.id, envelope.dst_chain, reason);
                self.stats.dropped += 1;
            }
        }
        DeliveryReport {
            id: envelope.id,
            src_chain: envelope.src_chain,
            dst_chain: envelope.dst_chain,
            outcome,
        }
    }

    /// Record `envelope` as delivered without a destination to run it on.
    pub fn discard(&mut self, envelope: Envelope, reason: &str) -> DeliveryReport {
        self.mark_delivered(envelope.id);
        self.stats.dropped += 1;
        tracing::warn!("Relay discarded {}: {}", envelope.id, reason);
        DeliveryReport {
            id: envelope.id,
            src_chain: envelope.src_chain,
            dst_chain: envelope.dst_chain,
            outcome: InboundOutcome::Dropped(reason.to_string()),
        }
    }

    pub fn deliver_next(
        &mut self,
        src: ChainId,
        dst: ChainId,
        target: &mut dyn InboundHandler,
    ) -> Option<DeliveryReport> {
        let envelope = self.pop_next(src, dst)?;
        Some(self.deliver(envelope, target))
    }

    /// Paths with at least one queued envelope, in (src, dst) order.
    pub fn busy_paths(&self) -> Vec<(ChainId, ChainId)> {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(path, _)| *path)
            .collect()
    }

    pub fn in_flight(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Queued envelopes, path by path.
    pub fn queued(&self) -> impl Iterator<Item = &Envelope> {
        self.queues.values().flat_map(|queue| queue.iter())
    }

    pub fn is_delivered(&self, id: &MessageId) -> bool {
        self.delivered.contains(id)
    }

    /// Delivered ids currently held for replay detection.
    pub fn remembered(&self) -> usize {
        self.delivered.len()
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }
}
