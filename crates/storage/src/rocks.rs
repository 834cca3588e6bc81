//! RocksDB-backed local store.
//!
//! # Column Families
//!
//! | CF | Key | Value |
//! |----|-----|-------|
//! | `challenge` | node id | SBOR [`NipostChallenge`] |
//! | `initial_post` | node id | SBOR [`InitialPost`] |
//! | `proving_progress` | node id | SBOR progress record |
//!
//! Read-modify-write operations hold `write_lock` so checks and writes are
//! atomic with respect to each other.

use crate::{LocalStore, ProvingProgress, StorageError};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use sbor::prelude::*;
use sbor::{BasicDecode, BasicEncode};
use smesher_types::{
    Hash, InitialPost, MerkleProof, NipostChallenge, NodeId, PoetRegistration, Post,
    PostMetadata, VrfNonce,
};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const CF_CHALLENGE: &str = "challenge";
const CF_INITIAL_POST: &str = "initial_post";
const CF_PROGRESS: &str = "proving_progress";

const COLUMN_FAMILIES: [&str; 3] = [CF_CHALLENGE, CF_INITIAL_POST, CF_PROGRESS];

/// [`LocalStore`] persisted in RocksDB.
pub struct RocksLocalStore {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksLocalStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening local store");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| StorageError::backend("open", e))?;

        info!(path = %path.display(), "local store opened");
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db.cf_handle(name).ok_or_else(|| StorageError::Backend {
            operation: "cf_handle".to_string(),
            details: format!("missing column family: {}", name),
        })
    }

    fn get<T: BasicDecode>(
        &self,
        cf_name: &'static str,
        node: &NodeId,
    ) -> Result<Option<T>, StorageError> {
        let cf = self.cf(cf_name)?;
        let Some(bytes) = self
            .db
            .get_cf(cf, node.as_bytes())
            .map_err(|e| StorageError::backend("get_cf", e))?
        else {
            return Ok(None);
        };
        sbor::basic_decode(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                what: cf_name,
                details: format!("{:?}", e),
            })
    }

    fn put<T: BasicEncode>(
        &self,
        cf_name: &'static str,
        node: &NodeId,
        value: &T,
    ) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        let bytes = sbor::basic_encode(value).map_err(|e| StorageError::Corrupt {
            what: cf_name,
            details: format!("{:?}", e),
        })?;
        let mut batch = WriteBatch::default();
        batch.put_cf(cf, node.as_bytes(), bytes);
        self.db
            .write(batch)
            .map_err(|e| StorageError::backend("write", e))
    }

    fn delete(&self, cf_name: &'static str, node: &NodeId) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db
            .delete_cf(cf, node.as_bytes())
            .map_err(|e| StorageError::backend("delete_cf", e))
    }

    fn insert_new<T: BasicEncode + BasicDecode>(
        &self,
        cf_name: &'static str,
        what: &'static str,
        node: &NodeId,
        value: &T,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if self.get::<T>(cf_name, node)?.is_some() {
            return Err(StorageError::AlreadyExists { what, node: *node });
        }
        self.put(cf_name, node, value)
    }
}

impl LocalStore for RocksLocalStore {
    fn add_challenge(
        &self,
        node: &NodeId,
        challenge: &NipostChallenge,
    ) -> Result<(), StorageError> {
        self.insert_new(CF_CHALLENGE, "challenge", node, challenge)
    }

    fn challenge(&self, node: &NodeId) -> Result<Option<NipostChallenge>, StorageError> {
        self.get(CF_CHALLENGE, node)
    }

    fn remove_challenge(&self, node: &NodeId) -> Result<(), StorageError> {
        self.delete(CF_CHALLENGE, node)
    }

    fn add_initial_post(&self, node: &NodeId, post: &InitialPost) -> Result<(), StorageError> {
        self.insert_new(CF_INITIAL_POST, "initial post", node, post)
    }

    fn initial_post(&self, node: &NodeId) -> Result<Option<InitialPost>, StorageError> {
        self.get(CF_INITIAL_POST, node)
    }

    fn remove_initial_post(&self, node: &NodeId) -> Result<(), StorageError> {
        self.delete(CF_INITIAL_POST, node)
    }

    fn proving_progress(&self, node: &NodeId) -> Result<ProvingProgress, StorageError> {
        Ok(self
            .get::<ProgressRecord>(CF_PROGRESS, node)?
            .map(ProvingProgress::from)
            .unwrap_or_default())
    }

    fn advance_progress(
        &self,
        node: &NodeId,
        progress: &ProvingProgress,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let current = self.proving_progress(node)?;
        if !current.can_advance_to(progress) {
            return Err(StorageError::InvalidTransition {
                node: *node,
                from: current.name(),
                to: progress.name(),
            });
        }
        self.put(CF_PROGRESS, node, &ProgressRecord::from(progress))
    }

    fn reset_progress(&self, node: &NodeId) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        self.delete(CF_PROGRESS, node)
    }
}

#[derive(Debug, Clone, BasicSbor)]
struct RegistrationRecord {
    address: String,
    challenge_hash: Hash,
    round_id: String,
    round_end_millis: u64,
}

impl From<&PoetRegistration> for RegistrationRecord {
    fn from(reg: &PoetRegistration) -> Self {
        let millis = reg
            .round_end
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self {
            address: reg.address.clone(),
            challenge_hash: reg.challenge_hash,
            round_id: reg.round_id.clone(),
            round_end_millis: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }
}

impl From<RegistrationRecord> for PoetRegistration {
    fn from(rec: RegistrationRecord) -> Self {
        Self {
            address: rec.address,
            challenge_hash: rec.challenge_hash,
            round_id: rec.round_id,
            round_end: UNIX_EPOCH + Duration::from_millis(rec.round_end_millis),
        }
    }
}

#[derive(Debug, Clone, BasicSbor)]
enum ProgressRecord {
    NotStarted,
    Registered {
        challenge: Hash,
        registrations: Vec<RegistrationRecord>,
    },
    ProofObtained {
        challenge: Hash,
        proof: Hash,
        membership: MerkleProof,
        leaf_count: u64,
    },
    ProofExecuted {
        challenge: Hash,
        proof: Hash,
        membership: MerkleProof,
        post: Post,
        metadata: PostMetadata,
        num_units: u32,
        vrf_nonce: VrfNonce,
    },
}

impl From<&ProvingProgress> for ProgressRecord {
    fn from(progress: &ProvingProgress) -> Self {
        match progress.clone() {
            ProvingProgress::NotStarted => ProgressRecord::NotStarted,
            ProvingProgress::Registered {
                challenge,
                registrations,
            } => ProgressRecord::Registered {
                challenge,
                registrations: registrations.iter().map(RegistrationRecord::from).collect(),
            },
            ProvingProgress::ProofObtained {
                challenge,
                proof,
                membership,
                leaf_count,
            } => ProgressRecord::ProofObtained {
                challenge,
                proof,
                membership,
                leaf_count,
            },
            ProvingProgress::ProofExecuted {
                challenge,
                proof,
                membership,
                post,
                metadata,
                num_units,
                vrf_nonce,
            } => ProgressRecord::ProofExecuted {
                challenge,
                proof,
                membership,
                post,
                metadata,
                num_units,
                vrf_nonce,
            },
        }
    }
}

impl From<ProgressRecord> for ProvingProgress {
    fn from(record: ProgressRecord) -> Self {
        match record {
            ProgressRecord::NotStarted => ProvingProgress::NotStarted,
            ProgressRecord::Registered {
                challenge,
                registrations,
            } => ProvingProgress::Registered {
                challenge,
                registrations: registrations
                    .into_iter()
                    .map(PoetRegistration::from)
                    .collect(),
            },
            ProgressRecord::ProofObtained {
                challenge,
                proof,
                membership,
                leaf_count,
            } => ProvingProgress::ProofObtained {
                challenge,
                proof,
                membership,
                leaf_count,
            },
            ProgressRecord::ProofExecuted {
                challenge,
                proof,
                membership,
                post,
                metadata,
                num_units,
                vrf_nonce,
            } => ProvingProgress::ProofExecuted {
                challenge,
                proof,
                membership,
                post,
                metadata,
                num_units,
                vrf_nonce,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_test_helpers::{
        atx_id, initial_challenge, regular_challenge, test_initial_post, test_node,
    };
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn open() -> (TempDir, RocksLocalStore) {
        let dir = TempDir::new().unwrap();
        let store = RocksLocalStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[traced_test]
    #[test]
    fn test_one_challenge_per_identity() {
        let (_dir, store) = open();
        let node = test_node(1);
        let initial = test_initial_post(atx_id(b"commit"));
        let first = initial_challenge(4, &initial);
        let second = regular_challenge(4, 3, atx_id(b"prev"));

        store.add_challenge(&node, &first).unwrap();
        assert!(matches!(
            store.add_challenge(&node, &second),
            Err(StorageError::AlreadyExists { .. })
        ));
        assert_eq!(store.challenge(&node).unwrap(), Some(first));

        store.add_challenge(&test_node(2), &second).unwrap();
    }

    #[traced_test]
    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let node = test_node(3);
        let challenge = regular_challenge(9, 4, atx_id(b"prev"));
        let post = test_initial_post(atx_id(b"commit"));
        let progress = ProvingProgress::Registered {
            challenge: challenge.hash(),
            registrations: vec![PoetRegistration {
                address: "poet-1".into(),
                challenge_hash: challenge.hash(),
                round_id: "12".into(),
                round_end: UNIX_EPOCH + Duration::from_millis(1_700_000_000_123),
            }],
        };

        {
            let store = RocksLocalStore::open(dir.path()).unwrap();
            store.add_challenge(&node, &challenge).unwrap();
            store.add_initial_post(&node, &post).unwrap();
            store.advance_progress(&node, &progress).unwrap();
        }

        let store = RocksLocalStore::open(dir.path()).unwrap();
        assert_eq!(store.challenge(&node).unwrap(), Some(challenge));
        assert_eq!(store.initial_post(&node).unwrap(), Some(post));
        assert_eq!(store.proving_progress(&node).unwrap(), progress);
    }

    #[traced_test]
    #[test]
    fn test_progress_transitions() {
        let (_dir, store) = open();
        let node = test_node(1);
        let challenge = Hash::from_bytes(b"c");
        let obtained = ProvingProgress::ProofObtained {
            challenge,
            proof: Hash::from_bytes(b"p"),
            membership: MerkleProof {
                leaf_index: 1,
                siblings: vec![Hash::from_bytes(b"s")],
            },
            leaf_count: 5,
        };
        let registered = ProvingProgress::Registered {
            challenge,
            registrations: vec![],
        };

        assert!(matches!(
            store.advance_progress(&node, &obtained),
            Err(StorageError::InvalidTransition {
                from: "not_started",
                to: "proof_obtained",
                ..
            })
        ));
        assert_eq!(
            store.proving_progress(&node).unwrap(),
            ProvingProgress::NotStarted
        );

        store.advance_progress(&node, &registered).unwrap();
        store.advance_progress(&node, &obtained).unwrap();
        assert!(matches!(
            store.advance_progress(&node, &registered),
            Err(StorageError::InvalidTransition {
                from: "proof_obtained",
                to: "registered",
                ..
            })
        ));

        store.reset_progress(&node).unwrap();
        store.advance_progress(&node, &registered).unwrap();
    }

    #[traced_test]
    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = open();
        let node = test_node(1);
        let challenge = regular_challenge(6, 1, atx_id(b"prev"));

        store.add_challenge(&node, &challenge).unwrap();
        assert_eq!(store.challenge(&node).unwrap(), Some(challenge));

        store.remove_challenge(&node).unwrap();
        store.remove_challenge(&node).unwrap();
        assert_eq!(store.challenge(&node).unwrap(), None);
        store.remove_initial_post(&node).unwrap();
    }
}
