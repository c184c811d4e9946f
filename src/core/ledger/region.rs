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

//! Per-region encrypted running sums.
//!
//! The only branch taken here is on the region code, which is public. Values
//! are combined homomorphically and never opened.

use crate::core::{
    algebra::CiphertextAlgebra,
    error::LedgerError,
    types::{Ciphertext, RegionCode, H256},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One registered region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEntry {
    /// Region code.
    pub code: RegionCode,
    /// Encrypted sum of every brightness value submitted under this code.
    pub sum: Ciphertext,
    /// Index in the registration list.
    pub position: u32,
}

/// Owner of all region entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionAggregator {
    entries: BTreeMap<RegionCode, RegionEntry>,
    order: Vec<RegionCode>,
}

impl RegionAggregator {
    /// No regions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, ordering by registration position.
    pub fn restore(mut entries: Vec<RegionEntry>) -> Self {
        entries.sort_by_key(|e| e.position);
        let mut out = Self::default();
        for e in entries {
            out.order.push(e.code.clone());
            out.entries.insert(e.code.clone(), e);
        }
        out
    }

    /// Compute the entry after adding `value` under `code`.
    pub fn stage_accumulate<A: CiphertextAlgebra>(
        &self,
        algebra: &A,
        code: &RegionCode,
        value: &Ciphertext,
    ) -> Result<RegionEntry, LedgerError> {
        if !code.is_within_limit() {
            return Err(LedgerError::RegionCodeTooLong);
        }
        match self.entries.get(code) {
            Some(e) => Ok(RegionEntry {
                code: code.clone(),
                sum: algebra.add(&e.sum, value)?,
                position: e.position,
            }),
            None => {
                let position =
                    u32::try_from(self.order.len()).map_err(|_| LedgerError::IdExhausted)?;
                Ok(RegionEntry {
                    code: code.clone(),
                    sum: algebra.add(&algebra.zero(), value)?,
                    position,
                })
            }
        }
    }

    /// Install a staged entry, registering the code on first sight.
    pub fn apply_entry(&mut self, entry: RegionEntry) {
        if !self.entries.contains_key(&entry.code) {
            self.order.push(entry.code.clone());
        }
        self.entries.insert(entry.code.clone(), entry);
    }

    /// Register `code` if new, then add `value` to its sum.
    pub fn register_and_accumulate<A: CiphertextAlgebra>(
        &mut self,
        algebra: &A,
        code: &RegionCode,
        value: &Ciphertext,
    ) -> Result<(), LedgerError> {
        let entry = self.stage_accumulate(algebra, code, value)?;
        self.apply_entry(entry);
        Ok(())
    }

    /// Encrypted `sum / total_count`.
    ///
    /// `total_count` is the number of observations in the whole ledger, not
    /// the number that named this region.
    pub fn regional_average<A: CiphertextAlgebra>(
        &self,
        algebra: &A,
        code: &RegionCode,
        total_count: u64,
    ) -> Result<Ciphertext, LedgerError> {
        let e = self.entries.get(code).ok_or(LedgerError::RegionNotFound)?;
        Ok(algebra.div_scalar(&e.sum, total_count)?)
    }

    /// Encrypted mean of `values`.
    pub fn aggregate<A: CiphertextAlgebra>(
        algebra: &A,
        values: &[Ciphertext],
    ) -> Result<Ciphertext, LedgerError> {
        let Some((first, rest)) = values.split_first() else {
            return Err(LedgerError::EmptyInput);
        };
        algebra.validate(first)?;
        let mut acc = first.clone();
        for v in rest {
            acc = algebra.add(&acc, v)?;
        }
        Ok(algebra.div_scalar(&acc, values.len() as u64)?)
    }

    /// Find a region by the hash used in notifications. O(regions).
    pub fn region_by_hash(&self, hash: &H256) -> Option<&RegionEntry> {
        self.order
            .iter()
            .find(|c| c.hash() == *hash)
            .and_then(|c| self.entries.get(c))
    }

    /// Entry for `code`.
    pub fn get(&self, code: &RegionCode) -> Option<&RegionEntry> {
        self.entries.get(code)
    }

    /// Whether `code` is registered.
    pub fn contains(&self, code: &RegionCode) -> bool {
        self.entries.contains_key(code)
    }

    /// Region codes in registration order.
    pub fn registered(&self) -> &[RegionCode] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{algebra::passthrough::PassthroughAlgebra, types::MAX_REGION_CODE_BYTES};

    fn enc(v: u64) -> Ciphertext {
        PassthroughAlgebra::encrypt(v)
    }

    #[test]
    fn regions_register_once_in_order() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut r = RegionAggregator::new();
        for (code, v) in [("EU-1", 10), ("EU-1", 20), ("AS-2", 7)] {
            r.register_and_accumulate(&alg, &RegionCode::new(code), &enc(v))
                .unwrap();
        }
        assert_eq!(
            r.registered(),
            &[RegionCode::new("EU-1"), RegionCode::new("AS-2")]
        );
        let eu = r.get(&RegionCode::new("EU-1")).unwrap();
        assert_eq!(PassthroughAlgebra::open(&eu.sum).unwrap(), 30);
    }

    #[test]
    fn average_divides_by_given_total() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut r = RegionAggregator::new();
        let eu = RegionCode::new("EU-1");
        r.register_and_accumulate(&alg, &eu, &enc(30)).unwrap();
        let avg = r.regional_average(&alg, &eu, 3).unwrap();
        assert_eq!(PassthroughAlgebra::open(&avg).unwrap(), 10);
        assert!(matches!(
            r.regional_average(&alg, &RegionCode::new("XX"), 3),
            Err(LedgerError::RegionNotFound)
        ));
    }

    #[test]
    fn aggregate_mean_and_empty() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        assert!(matches!(
            RegionAggregator::aggregate(&alg, &[]),
            Err(LedgerError::EmptyInput)
        ));
        let m = RegionAggregator::aggregate(&alg, &[enc(3), enc(6), enc(9)]).unwrap();
        assert_eq!(PassthroughAlgebra::open(&m).unwrap(), 6);
    }

    #[test]
    fn lookup_by_hash() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut r = RegionAggregator::new();
        let as2 = RegionCode::new("AS-2");
        r.register_and_accumulate(&alg, &RegionCode::new("EU-1"), &enc(1)).unwrap();
        r.register_and_accumulate(&alg, &as2, &enc(1)).unwrap();
        assert_eq!(r.region_by_hash(&as2.hash()).map(|e| &e.code), Some(&as2));
        assert!(r.region_by_hash(&H256::from_bytes([0u8; 32])).is_none());
    }

    #[test]
    fn restore_preserves_registration_order() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut r = RegionAggregator::new();
        for code in ["ZZ-9", "AA-1", "MM-5"] {
            r.register_and_accumulate(&alg, &RegionCode::new(code), &enc(1)).unwrap();
        }
        // Persisted entries come back in key order.
        let mut entries: Vec<RegionEntry> = r
            .registered()
            .iter()
            .filter_map(|c| r.get(c).cloned())
            .collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        assert_eq!(RegionAggregator::restore(entries), r);
    }

    #[test]
    fn overlong_code_is_rejected() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let mut r = RegionAggregator::new();
        let long = RegionCode::new("X".repeat(MAX_REGION_CODE_BYTES + 1));
        assert!(matches!(
            r.register_and_accumulate(&alg, &long, &enc(1)),
            Err(LedgerError::RegionCodeTooLong)
        ));
        assert!(r.registered().is_empty());

        let edge = RegionCode::new("X".repeat(MAX_REGION_CODE_BYTES));
        r.register_and_accumulate(&alg, &edge, &enc(1)).unwrap();
        assert_eq!(r.registered(), &[edge]);
    }
}
