//! # Core Domain Entities
//!
//! Identity types shared by the commit and query crates.
//!
//! ## Clusters
//!
//! - **Identity**: `MspId`, `PeerInfo`, `PeerRoles`
//! - **Topology**: `PeerMap` (organization → peers)
//! - **Transactions**: `TxId`, `TxValidationCode`

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of an organization (membership service provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct MspId(pub String);

impl MspId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MspId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MspId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Roles a peer advertises on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRoles {
    /// Peer endorses transaction proposals.
    pub endorsing: bool,
    /// Peer answers chaincode queries.
    pub chaincode_query: bool,
    /// Peer answers ledger (channel configuration) queries.
    pub ledger_query: bool,
    /// Peer emits block and transaction events.
    pub event_source: bool,
}

impl Default for PeerRoles {
    fn default() -> Self {
        Self {
            endorsing: true,
            chaincode_query: true,
            ledger_query: true,
            event_source: true,
        }
    }
}

/// A remote peer on a channel.
///
/// The organization id is fixed at construction and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Unique peer name (e.g. `peer0.org1.example.com`).
    pub name: String,
    /// Owning organization.
    msp_id: MspId,
    /// Endpoint URL, informational only.
    pub url: String,
    /// Channel roles.
    pub roles: PeerRoles,
}

impl PeerInfo {
    pub fn new(name: impl Into<String>, msp_id: impl Into<MspId>) -> Self {
        let name = name.into();
        Self {
            url: format!("grpcs://{}", name),
            name,
            msp_id: msp_id.into(),
            roles: PeerRoles::default(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_roles(mut self, roles: PeerRoles) -> Self {
        self.roles = roles;
        self
    }

    pub fn msp_id(&self) -> &MspId {
        &self.msp_id
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.msp_id)
    }
}

// =============================================================================
// CLUSTER B: TOPOLOGY
// =============================================================================

/// Peers of a channel grouped by organization, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMap {
    entries: Vec<(MspId, Vec<PeerInfo>)>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group peers by organization. Peers without an organization are skipped.
    pub fn from_peers<I>(peers: I) -> Self
    where
        I: IntoIterator<Item = PeerInfo>,
    {
        let mut map = Self::new();
        for peer in peers {
            if peer.msp_id().is_empty() {
                continue;
            }
            map.insert(peer);
        }
        map
    }

    pub fn insert(&mut self, peer: PeerInfo) {
        match self.entries.iter_mut().find(|(msp, _)| msp == peer.msp_id()) {
            Some((_, list)) => list.push(peer),
            None => self.entries.push((peer.msp_id().clone(), vec![peer])),
        }
    }

    /// Peers of one organization; empty when the organization is unknown.
    pub fn get(&self, msp_id: &MspId) -> &[PeerInfo] {
        self.entries
            .iter()
            .find(|(msp, _)| msp == msp_id)
            .map(|(_, peers)| peers.as_slice())
            .unwrap_or(&[])
    }

    pub fn msp_ids(&self) -> impl Iterator<Item = &MspId> {
        self.entries.iter().map(|(msp, _)| msp)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MspId, &[PeerInfo])> {
        self.entries.iter().map(|(msp, peers)| (msp, peers.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// Transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh random transaction id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Commit-time validation code reported by a peer for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxValidationCode {
    Valid,
    EndorsementPolicyFailure,
    MvccReadConflict,
    PhantomReadConflict,
    DuplicateTxId,
    BadPayload,
    Other(String),
}

impl TxValidationCode {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Parse the wire name of a code. Unknown names are kept verbatim.
    pub fn from_name(name: &str) -> Self {
        match name {
            "VALID" => Self::Valid,
            "ENDORSEMENT_POLICY_FAILURE" => Self::EndorsementPolicyFailure,
            "MVCC_READ_CONFLICT" => Self::MvccReadConflict,
            "PHANTOM_READ_CONFLICT" => Self::PhantomReadConflict,
            "DUPLICATE_TXID" => Self::DuplicateTxId,
            "BAD_PAYLOAD" => Self::BadPayload,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Valid => "VALID",
            Self::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            Self::MvccReadConflict => "MVCC_READ_CONFLICT",
            Self::PhantomReadConflict => "PHANTOM_READ_CONFLICT",
            Self::DuplicateTxId => "DUPLICATE_TXID",
            Self::BadPayload => "BAD_PAYLOAD",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for TxValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_map_groups_in_first_seen_order() {
        let map = PeerMap::from_peers(vec![
            PeerInfo::new("peer0.org2", "Org2MSP"),
            PeerInfo::new("peer0.org1", "Org1MSP"),
            PeerInfo::new("peer1.org2", "Org2MSP"),
            PeerInfo::new("orphan", ""),
        ]);

        let msps: Vec<_> = map.msp_ids().map(MspId::as_str).collect();
        assert_eq!(msps, vec!["Org2MSP", "Org1MSP"]);
        assert_eq!(map.get(&"Org2MSP".into()).len(), 2);
        assert!(map.get(&"Org9MSP".into()).is_empty());
    }

    #[test]
    fn test_tx_id_generation_is_unique() {
        let a = TxId::generate();
        let b = TxId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert!(TxId::new("  ").is_empty());
    }

    #[test]
    fn test_validation_code_names() {
        assert!(TxValidationCode::from_name("VALID").is_valid());
        assert_eq!(
            TxValidationCode::from_name("MVCC_READ_CONFLICT"),
            TxValidationCode::MvccReadConflict
        );
        let custom = TxValidationCode::from_name("INVALID_WRITESET");
        assert_eq!(custom.to_string(), "INVALID_WRITESET");
        assert!(!custom.is_valid());
    }
}
