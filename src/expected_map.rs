/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Snapshots of the test application's replicated entity states.
//!
//! During an experiment, the test application keeps an "expected map" on every node: for each entity it
//! created, the last transaction it submitted and the last transaction it saw handled by consensus. At
//! the end of the experiment each node's map is saved as a [borsh]-encoded snapshot. Under a correct
//! consensus protocol, all nodes' maps are equal up to entities that were legitimately deleted or expired.

use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    io,
};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use crate::logging::first_seven_base64_chars;

/// Identifier of an entity of the test application, e.g. an account or a file.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct EntityKey {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityKey {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum EntityType {
    Crypto,
    File,
    Blob,
    Nft,
}

/// How far a transaction got through the submit → consensus → handle pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum TransactionState {
    Initialized,
    Submitted,
    SubmissionFailed,
    Handled,
    HandleFailed,
    HandleRejected,
    InvalidSig,
    HandleEntityTypeMismatch,
    ReconnectOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum TransactionType {
    Create,
    Update,
    Transfer,
    Append,
    Delete,
    Expire,
}

impl TransactionType {
    /// Whether a transaction of this type legitimately removes its entity from the map.
    pub const fn removes_entity(&self) -> bool {
        matches!(self, TransactionType::Delete | TransactionType::Expire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Status {
    pub transaction_state: TransactionState,
    pub transaction_type: TransactionType,
}

impl Status {
    pub const fn new(transaction_state: TransactionState, transaction_type: TransactionType) -> Self {
        Self {
            transaction_state,
            transaction_type,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.transaction_state, self.transaction_type)
    }
}

/// SHA256 digest of an entity's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn digest(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&first_seven_base64_chars(&self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// What a node expects an entity to look like.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExpectedValue {
    pub entity_type: EntityType,
    pub is_errored: bool,
    pub hash: Option<ContentHash>,
    pub latest_submit_status: Option<Status>,
    pub latest_handled_status: Option<Status>,
    pub history_handled_status: Option<Status>,
}

impl ExpectedValue {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            is_errored: false,
            hash: None,
            latest_submit_status: None,
            latest_handled_status: None,
            history_handled_status: None,
        }
    }

    /// The type of the most recent transaction known to have been handled for this entity.
    pub fn last_transaction_type(&self) -> Option<TransactionType> {
        self.latest_handled_status
            .or(self.history_handled_status)
            .map(|status| status.transaction_type)
    }
}

pub type ExpectedMap = BTreeMap<EntityKey, ExpectedValue>;

/// Expected maps of every node, in node order. A node whose snapshot was not collected has no map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpectedMapData {
    maps: Vec<Option<ExpectedMap>>,
}

impl ExpectedMapData {
    pub fn new(maps: Vec<ExpectedMap>) -> Self {
        Self {
            maps: maps.into_iter().map(Some).collect(),
        }
    }

    pub fn from_nodes(maps: Vec<Option<ExpectedMap>>) -> Self {
        Self { maps }
    }

    /// Decode one borsh snapshot per node. Nodes without a snapshot keep no map.
    pub fn from_snapshots<B: AsRef<[u8]>>(snapshots: &[Option<B>]) -> Result<Self, SnapshotError> {
        let maps = snapshots
            .iter()
            .enumerate()
            .map(|(node, snapshot)| match snapshot {
                Some(bytes) => decode_snapshot(bytes.as_ref())
                    .map(Some)
                    .map_err(|source| SnapshotError { node, source }),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { maps })
    }

    pub fn node_count(&self) -> usize {
        self.maps.len()
    }

    pub fn map(&self, node: usize) -> Option<&ExpectedMap> {
        self.maps.get(node).and_then(Option::as_ref)
    }
}

pub fn encode_snapshot(map: &ExpectedMap) -> io::Result<Vec<u8>> {
    map.try_to_vec()
}

pub fn decode_snapshot(bytes: &[u8]) -> io::Result<ExpectedMap> {
    ExpectedMap::try_from_slice(bytes)
}

/// A node's snapshot could not be decoded.
#[derive(Debug)]
pub struct SnapshotError {
    pub node: usize,
    pub source: io::Error,
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "expected map snapshot of node {} is corrupt: {}", self.node, self.source)
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
