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

//! Durable layout of ledger tables.
//!
//! ```text
//! obs/<id:u64 BE>        -> canonical(ObservationRecord)
//! region/<code bytes>    -> canonical(RegionEntry)
//! pending/<request id>   -> canonical(PendingRevealRequest)
//! meta/last_id           -> u64 BE
//! ```

use crate::core::{
    error::LedgerError,
    ledger::{observation::ObservationRecord, region::RegionEntry},
    oracle::bridge::PendingRevealRequest,
    state::persistent_state::{KvOp, PersistentState},
    types::{
        decode_canonical_limited, encode_canonical_limited, CodecError, RequestId,
        MAX_RECORD_BYTES,
    },
};

const OBS_PREFIX: &[u8] = b"obs/";
const REGION_PREFIX: &[u8] = b"region/";
const PENDING_PREFIX: &[u8] = b"pending/";
const LAST_ID_KEY: &[u8] = b"meta/last_id";

/// Everything needed to rebuild an executor.
#[derive(Debug, Default)]
pub struct LedgerSnapshot {
    /// Observation records in id order.
    pub observations: Vec<ObservationRecord>,
    /// Region entries (any order; `position` carries registration order).
    pub regions: Vec<RegionEntry>,
    /// Outstanding reveal requests.
    pub pending: Vec<PendingRevealRequest>,
    /// Highest id ever assigned.
    pub last_id: u64,
}

/// Ledger tables on top of [`PersistentState`].
///
/// Writes and reads share the `MAX_RECORD_BYTES` cap, so anything committed
/// can be loaded again.
#[derive(Clone)]
pub struct LedgerStore {
    state: PersistentState,
}

fn key(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(prefix.len() + suffix.len());
    k.extend_from_slice(prefix);
    k.extend_from_slice(suffix);
    k
}

impl LedgerStore {
    /// Open (or create) the store in directory `path`.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        Ok(Self {
            state: PersistentState::open(path)?,
        })
    }

    /// Write op for an observation record.
    pub fn put_observation(rec: &ObservationRecord) -> Result<KvOp, LedgerError> {
        Ok(KvOp::Put {
            key: key(OBS_PREFIX, &rec.encrypted.id.0.to_be_bytes()),
            value: encode_canonical_limited(rec, MAX_RECORD_BYTES)?,
        })
    }

    /// Write op for a region entry.
    pub fn put_region(entry: &RegionEntry) -> Result<KvOp, LedgerError> {
        Ok(KvOp::Put {
            key: key(REGION_PREFIX, entry.code.as_str().as_bytes()),
            value: encode_canonical_limited(entry, MAX_RECORD_BYTES)?,
        })
    }

    /// Write op for a pending request.
    pub fn put_pending(p: &PendingRevealRequest) -> Result<KvOp, LedgerError> {
        Ok(KvOp::Put {
            key: key(PENDING_PREFIX, &p.request_id.0),
            value: encode_canonical_limited(p, MAX_RECORD_BYTES)?,
        })
    }

    /// Delete op for a consumed or expired request.
    pub fn del_pending(request_id: &RequestId) -> KvOp {
        KvOp::Del {
            key: key(PENDING_PREFIX, &request_id.0),
        }
    }

    /// Write op for the id counter.
    pub fn put_last_id(last_id: u64) -> KvOp {
        KvOp::Put {
            key: LAST_ID_KEY.to_vec(),
            value: last_id.to_be_bytes().to_vec(),
        }
    }

    /// Apply ops in one transaction.
    pub fn commit(&self, ops: Vec<KvOp>) -> Result<(), LedgerError> {
        Ok(self.state.commit_atomic(ops)?)
    }

    /// Read every table.
    pub fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        let mut snap = LedgerSnapshot::default();
        for (_, v) in self.state.scan_prefix(OBS_PREFIX)? {
            snap.observations
                .push(decode_canonical_limited(&v, MAX_RECORD_BYTES)?);
        }
        for (_, v) in self.state.scan_prefix(REGION_PREFIX)? {
            snap.regions.push(decode_canonical_limited(&v, MAX_RECORD_BYTES)?);
        }
        for (_, v) in self.state.scan_prefix(PENDING_PREFIX)? {
            snap.pending.push(decode_canonical_limited(&v, MAX_RECORD_BYTES)?);
        }
        if let Some(v) = self.state.get(LAST_ID_KEY)? {
            let b: [u8; 8] = v
                .as_slice()
                .try_into()
                .map_err(|_| CodecError::Deserialize)?;
            snap.last_id = u64::from_be_bytes(b);
        }
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        algebra::passthrough::PassthroughAlgebra,
        types::{
            CipherFields, Ciphertext, ContributorId, DecryptedObservation, EncryptedObservation,
            ObservationId, RegionCode,
        },
    };

    fn record(brightness: Ciphertext) -> ObservationRecord {
        let z = PassthroughAlgebra::encrypt(0);
        ObservationRecord {
            encrypted: EncryptedObservation {
                id: ObservationId(1),
                fields: CipherFields {
                    brightness,
                    latitude: z.clone(),
                    longitude: z.clone(),
                    timestamp: z,
                },
                submitted_at_ms: 0,
                contributor: ContributorId([1; 32]),
                region: RegionCode::new("EU-1"),
            },
            decrypted: DecryptedObservation::default(),
        }
    }

    #[test]
    fn oversized_record_is_refused_before_commit() {
        let big = record(Ciphertext(vec![0u8; MAX_RECORD_BYTES + 1]));
        assert!(matches!(
            LedgerStore::put_observation(&big),
            Err(LedgerError::Codec(CodecError::TooLarge))
        ));
    }

    #[test]
    fn committed_records_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path().to_str().unwrap()).unwrap();
        let rec = record(PassthroughAlgebra::encrypt(42));
        store
            .commit(vec![
                LedgerStore::put_observation(&rec).unwrap(),
                LedgerStore::put_last_id(1),
            ])
            .unwrap();

        let snap = store.load().unwrap();
        assert_eq!(snap.observations, vec![rec]);
        assert_eq!(snap.last_id, 1);
        assert!(snap.regions.is_empty());
        assert!(snap.pending.is_empty());
    }
}
