//! Usage counters for round robin routing
//!
//! The table is shared by every round robin handler built from it, across
//! channels. Counters are created at zero on first sight and only grow.

use parking_lot::Mutex;
use shared_types::PeerInfo;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-peer query counters keyed by peer name. Cloning shares the table.
#[derive(Clone, Debug, Default)]
pub struct PeerUsageTable {
    counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl PeerUsageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, peer_name: &str) -> u64 {
        self.counts.lock().get(peer_name).copied().unwrap_or(0)
    }

    /// Overwrite a counter.
    pub fn set(&self, peer_name: &str, count: u64) {
        self.counts.lock().insert(peer_name.to_string(), count);
    }

    /// Count one successful query against `peer_name`.
    pub fn record_success(&self, peer_name: &str) -> u64 {
        let mut counts = self.counts.lock();
        let count = counts.entry(peer_name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// `peers` sorted by ascending usage. Ties keep their input order.
    pub fn order(&self, peers: &[PeerInfo]) -> Vec<PeerInfo> {
        let mut counts = self.counts.lock();
        let mut ranked: Vec<(u64, &PeerInfo)> = peers
            .iter()
            .map(|peer| {
                let count = *counts.entry(peer.name.clone()).or_insert(0);
                (count, peer)
            })
            .collect();
        drop(counts);
        ranked.sort_by_key(|(count, _)| *count);
        ranked.into_iter().map(|(_, peer)| peer.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }
}
