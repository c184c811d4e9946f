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
#![deny(missing_docs)]

//! Append-only observation ledger.
//!
//! Mutations come in two halves: `stage_*` validates against the current state
//! and returns the record to write, `apply_*` installs it. The executor commits
//! staged records to the durable store between the two, so a failed commit
//! leaves the ledger untouched.

use crate::core::{
    algebra::CiphertextAlgebra,
    error::LedgerError,
    types::{
        CipherFields, ContributorId, DecryptedObservation, EncryptedObservation, ObservationId,
        RegionCode, RevealedValues,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encrypted record and its decrypted companion (same id).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Submitted ciphertexts.
    pub encrypted: EncryptedObservation,
    /// Reveal result (empty until revealed).
    pub decrypted: DecryptedObservation,
}

/// Owner of all observation records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservationLedger {
    records: BTreeMap<ObservationId, ObservationRecord>,
    last_id: u64,
}

impl ObservationLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records. `last_id` never moves backwards, even if
    /// the highest records are missing.
    pub fn restore(records: Vec<ObservationRecord>, last_id: u64) -> Self {
        let mut map = BTreeMap::new();
        let mut max = last_id;
        for r in records {
            max = max.max(r.encrypted.id.0);
            map.insert(r.encrypted.id, r);
        }
        Self {
            records: map,
            last_id: max,
        }
    }

    /// Validate a submission and build its record under the next id.
    pub fn stage_submit<A: CiphertextAlgebra>(
        &self,
        algebra: &A,
        fields: CipherFields,
        region: RegionCode,
        contributor: ContributorId,
        now_ms: u64,
    ) -> Result<ObservationRecord, LedgerError> {
        for ct in [
            &fields.brightness,
            &fields.latitude,
            &fields.longitude,
            &fields.timestamp,
        ] {
            if ct.0.is_empty() {
                return Err(LedgerError::MalformedCiphertext);
            }
            algebra.validate(ct)?;
        }
        if !region.is_within_limit() {
            return Err(LedgerError::RegionCodeTooLong);
        }
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(LedgerError::IdExhausted)?;

        Ok(ObservationRecord {
            encrypted: EncryptedObservation {
                id: ObservationId(next),
                fields,
                submitted_at_ms: now_ms,
                contributor,
                region,
            },
            decrypted: DecryptedObservation::default(),
        })
    }

    /// Install a staged submission.
    pub fn apply_submit(&mut self, record: ObservationRecord) {
        self.last_id = record.encrypted.id.0;
        self.records.insert(record.encrypted.id, record);
    }

    /// Stage and apply in one step.
    pub fn submit<A: CiphertextAlgebra>(
        &mut self,
        algebra: &A,
        fields: CipherFields,
        region: RegionCode,
        contributor: ContributorId,
        now_ms: u64,
    ) -> Result<ObservationId, LedgerError> {
        let rec = self.stage_submit(algebra, fields, region, contributor, now_ms)?;
        let id = rec.encrypted.id;
        self.apply_submit(rec);
        Ok(id)
    }

    /// Encrypted record.
    pub fn get_encrypted(&self, id: ObservationId) -> Result<&EncryptedObservation, LedgerError> {
        self.records
            .get(&id)
            .map(|r| &r.encrypted)
            .ok_or(LedgerError::NotFound)
    }

    /// Decrypted companion record.
    pub fn get_decrypted(&self, id: ObservationId) -> Result<&DecryptedObservation, LedgerError> {
        self.records
            .get(&id)
            .map(|r| &r.decrypted)
            .ok_or(LedgerError::NotFound)
    }

    /// Build the revealed form of record `id`.
    pub(crate) fn stage_reveal(
        &self,
        id: ObservationId,
        values: RevealedValues,
    ) -> Result<ObservationRecord, LedgerError> {
        let rec = self.records.get(&id).ok_or(LedgerError::NotFound)?;
        if rec.decrypted.revealed {
            return Err(LedgerError::AlreadyRevealed);
        }
        let mut out = rec.clone();
        out.decrypted = DecryptedObservation {
            values,
            revealed: true,
        };
        Ok(out)
    }

    /// Replace an existing record with its staged revealed form.
    pub(crate) fn apply_reveal(&mut self, record: ObservationRecord) {
        if let Some(slot) = self.records.get_mut(&record.encrypted.id) {
            if !slot.decrypted.revealed {
                *slot = record;
            }
        }
    }

    /// Write the reveal result. Only the oracle bridge calls this.
    pub(crate) fn mark_revealed(
        &mut self,
        id: ObservationId,
        values: RevealedValues,
    ) -> Result<(), LedgerError> {
        let rec = self.stage_reveal(id, values)?;
        self.apply_reveal(rec);
        Ok(())
    }

    /// Total number of observations.
    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Highest id assigned so far (0 when empty).
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Records in id order.
    pub fn records(&self) -> impl Iterator<Item = &ObservationRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algebra::passthrough::PassthroughAlgebra;
    use crate::core::types::Ciphertext;

    fn fields(b: u64) -> CipherFields {
        CipherFields {
            brightness: PassthroughAlgebra::encrypt(b),
            latitude: PassthroughAlgebra::encrypt(48),
            longitude: PassthroughAlgebra::encrypt(11),
            timestamp: PassthroughAlgebra::encrypt(1_700_000_000),
        }
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut l = ObservationLedger::new();
        let who = ContributorId([1u8; 32]);
        for expected in 1..=5u64 {
            let id = l.submit(&alg, fields(expected), RegionCode::new("EU-1"), who, 10).unwrap();
            assert_eq!(id, ObservationId(expected));
        }
        assert_eq!(l.count(), 5);
    }

    #[test]
    fn malformed_submission_changes_nothing() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut l = ObservationLedger::new();
        let mut f = fields(1);
        f.longitude = Ciphertext(vec![]);
        let before = l.clone();
        let r = l.submit(&alg, f, RegionCode::new("EU-1"), ContributorId([1u8; 32]), 0);
        assert!(matches!(r, Err(LedgerError::MalformedCiphertext)));
        assert_eq!(l, before);
    }

    #[test]
    fn fresh_record_is_unrevealed_and_zero() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut l = ObservationLedger::new();
        let id = l
            .submit(&alg, fields(3), RegionCode::new("AS-2"), ContributorId([2u8; 32]), 5)
            .unwrap();
        let d = l.get_decrypted(id).unwrap();
        assert!(!d.revealed);
        assert_eq!(d.values, RevealedValues::default());
        assert!(matches!(l.get_decrypted(ObservationId(99)), Err(LedgerError::NotFound)));
        assert!(matches!(l.get_encrypted(ObservationId(0)), Err(LedgerError::NotFound)));
    }

    #[test]
    fn mark_revealed_only_once() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut l = ObservationLedger::new();
        let id = l
            .submit(&alg, fields(3), RegionCode::new("AS-2"), ContributorId([2u8; 32]), 5)
            .unwrap();
        let v = RevealedValues::from_array([3, 48, 11, 1_700_000_000]);
        l.mark_revealed(id, v).unwrap();
        assert!(matches!(
            l.mark_revealed(id, RevealedValues::default()),
            Err(LedgerError::AlreadyRevealed)
        ));
        assert_eq!(l.get_decrypted(id).unwrap().values, v);
    }

    #[test]
    fn restore_keeps_counter_monotone() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut l = ObservationLedger::new();
        let who = ContributorId([1u8; 32]);
        l.submit(&alg, fields(1), RegionCode::new("EU-1"), who, 0).unwrap();
        let recs: Vec<_> = l.records().cloned().collect();
        let mut back = ObservationLedger::restore(recs, 7);
        let id = back.submit(&alg, fields(2), RegionCode::new("EU-1"), who, 0).unwrap();
        assert_eq!(id, ObservationId(8));
    }
}
