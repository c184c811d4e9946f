// Copyright (c) 2026 Skyglow
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! sled-backed key/value tables. A batch of ops lands entirely or not at all.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use thiserror::Error;
use tracing::debug;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// Database directory could not be opened.
    #[error("db open: {0}")]
    DbOpen(String),
    /// Read, write or flush failed.
    #[error("db io: {0}")]
    DbIo(String),
}

/// One write in a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOp {
    /// Insert or overwrite.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Remove (no-op if absent).
    Del {
        /// Key.
        key: Vec<u8>,
    },
}

/// Handle to the on-disk tables. Clones share the same database.
#[derive(Clone)]
pub struct PersistentState {
    db: sled::Db,
}

impl PersistentState {
    /// Open sled DB at path (directory).
    pub fn open(path: &str) -> Result<Self, StateError> {
        let db = sled::open(path).map_err(|e| StateError::DbOpen(e.to_string()))?;
        Ok(Self { db })
    }

    /// Value under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let v = self
            .db
            .get(key)
            .map_err(|e| StateError::DbIo(e.to_string()))?;
        Ok(v.map(|iv| iv.to_vec()))
    }

    /// All pairs under `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StateError> {
        self.db
            .scan_prefix(prefix)
            .map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| StateError::DbIo(e.to_string()))
            })
            .collect()
    }

    /// Apply `ops` in one sled transaction, then flush.
    pub fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StateError> {
        let res: Result<(), TransactionError<StateError>> = self.db.transaction(|t| {
            for op in &ops {
                let r = match op {
                    KvOp::Put { key, value } => t.insert(key.as_slice(), value.as_slice()),
                    KvOp::Del { key } => t.remove(key.as_slice()),
                };
                r.map_err(|e| {
                    ConflictableTransactionError::Abort(StateError::DbIo(format!("{e:?}")))
                })?;
            }
            Ok(())
        });

        match res {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StateError::DbIo(e.to_string())),
        }
        self.db
            .flush()
            .map_err(|e| StateError::DbIo(e.to_string()))?;
        debug!(ops = ops.len(), "state batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(k: &[u8], v: &[u8]) -> KvOp {
        KvOp::Put {
            key: k.to_vec(),
            value: v.to_vec(),
        }
    }

    #[test]
    fn batch_put_delete_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let st = PersistentState::open(dir.path().to_str().unwrap()).unwrap();
        st.commit_atomic(vec![put(b"a/2", b"two"), put(b"a/1", b"one"), put(b"b/1", b"x")])
            .unwrap();
        st.commit_atomic(vec![KvOp::Del { key: b"a/2".to_vec() }]).unwrap();

        let a = st.scan_prefix(b"a/").unwrap();
        assert_eq!(a, vec![(b"a/1".to_vec(), b"one".to_vec())]);
        assert_eq!(st.get(b"b/1").unwrap(), Some(b"x".to_vec()));
        assert_eq!(st.get(b"a/2").unwrap(), None);
    }

    #[test]
    fn reopen_sees_committed_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        {
            let st = PersistentState::open(&path).unwrap();
            st.commit_atomic(vec![put(b"meta/k", b"v")]).unwrap();
        }
        let st = PersistentState::open(&path).unwrap();
        assert_eq!(st.get(b"meta/k").unwrap(), Some(b"v".to_vec()));
    }
}
