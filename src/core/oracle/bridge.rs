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

//! Decryption oracle bridge: reveal request correlation and callback checks.
//!
//! Per observation: `Submitted -> RequestPending -> Revealed`. At most one
//! request is pending per observation, and a request id is removed from the
//! table the moment its callback is accepted, so a replay finds nothing.

use crate::core::{
    access::AccessControl,
    algebra::CiphertextAlgebra,
    error::LedgerError,
    ledger::observation::{ObservationLedger, ObservationRecord},
    types::{
        Ciphertext, ContributorId, ObservationId, RequestId, RevealProof, RevealState,
        RevealedValues,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outstanding reveal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRevealRequest {
    /// Token issued by the algebra.
    pub request_id: RequestId,
    /// Target observation.
    pub observation_id: ObservationId,
    /// Exactly the ciphertexts handed to the oracle.
    pub ciphertexts: Vec<Ciphertext>,
    /// Request time, ms since UNIX epoch.
    pub requested_at_ms: u64,
}

/// Owner of the pending-request table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecryptionOracleBridge {
    by_request: BTreeMap<RequestId, PendingRevealRequest>,
    by_observation: BTreeMap<ObservationId, RequestId>,
}

impl DecryptionOracleBridge {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted requests.
    pub fn restore(pending: Vec<PendingRevealRequest>) -> Self {
        let mut out = Self::default();
        for p in pending {
            out.apply_request(p);
        }
        out
    }

    /// Check a reveal request and dispatch it to the algebra.
    ///
    /// The dispatch is the only side effect; the correlation is not recorded
    /// until [`DecryptionOracleBridge::apply_request`].
    pub fn stage_request<A: CiphertextAlgebra, C: AccessControl>(
        &self,
        ledger: &ObservationLedger,
        algebra: &A,
        access: &C,
        requester: &ContributorId,
        id: ObservationId,
        now_ms: u64,
    ) -> Result<PendingRevealRequest, LedgerError> {
        let obs = ledger.get_encrypted(id)?;
        if !access.authorize(requester, obs) {
            return Err(LedgerError::Unauthorized);
        }
        if ledger.get_decrypted(id)?.revealed {
            return Err(LedgerError::AlreadyRevealed);
        }
        if self.by_observation.contains_key(&id) {
            return Err(LedgerError::RequestAlreadyPending);
        }

        let ciphertexts = obs.fields.to_vec();
        let request_id = algebra.begin_reveal(&ciphertexts)?;
        Ok(PendingRevealRequest {
            request_id,
            observation_id: id,
            ciphertexts,
            requested_at_ms: now_ms,
        })
    }

    /// Record a dispatched request.
    pub fn apply_request(&mut self, pending: PendingRevealRequest) {
        self.by_observation
            .insert(pending.observation_id, pending.request_id);
        self.by_request.insert(pending.request_id, pending);
    }

    /// `stage_request` then `apply_request`.
    pub fn request_reveal<A: CiphertextAlgebra, C: AccessControl>(
        &mut self,
        ledger: &ObservationLedger,
        algebra: &A,
        access: &C,
        requester: &ContributorId,
        id: ObservationId,
        now_ms: u64,
    ) -> Result<RequestId, LedgerError> {
        let p = self.stage_request(ledger, algebra, access, requester, id, now_ms)?;
        let rid = p.request_id;
        self.apply_request(p);
        Ok(rid)
    }

    /// Validate an oracle callback without touching any state.
    ///
    /// Returns the correlation to consume and the revealed record to write.
    pub fn stage_fulfill<A: CiphertextAlgebra>(
        &self,
        ledger: &ObservationLedger,
        algebra: &A,
        request_id: &RequestId,
        values: RevealedValues,
        proof: &RevealProof,
    ) -> Result<(PendingRevealRequest, ObservationRecord), LedgerError> {
        let pending = self
            .by_request
            .get(request_id)
            .ok_or(LedgerError::UnknownRequest)?;
        if !algebra.verify_reveal(request_id, &pending.ciphertexts, &values.to_array(), proof) {
            return Err(LedgerError::ProofVerificationFailed);
        }
        let record = ledger.stage_reveal(pending.observation_id, values)?;
        Ok((pending.clone(), record))
    }

    /// Remove a correlation. Returns it if it was present.
    pub fn consume(&mut self, request_id: &RequestId) -> Option<PendingRevealRequest> {
        let p = self.by_request.remove(request_id)?;
        if self.by_observation.get(&p.observation_id) == Some(request_id) {
            self.by_observation.remove(&p.observation_id);
        }
        Some(p)
    }

    /// Verify a callback, consume its correlation and write the reveal.
    pub fn fulfill<A: CiphertextAlgebra>(
        &mut self,
        ledger: &mut ObservationLedger,
        algebra: &A,
        request_id: &RequestId,
        values: RevealedValues,
        proof: &RevealProof,
    ) -> Result<ObservationId, LedgerError> {
        let (pending, _) = self.stage_fulfill(ledger, algebra, request_id, values, proof)?;
        self.consume(request_id);
        ledger.mark_revealed(pending.observation_id, values)?;
        Ok(pending.observation_id)
    }

    /// Requests at least `ttl_ms` old at `now_ms`. Empty when `ttl_ms == 0`.
    pub fn expired(&self, now_ms: u64, ttl_ms: u64) -> Vec<PendingRevealRequest> {
        if ttl_ms == 0 {
            return Vec::new();
        }
        self.by_request
            .values()
            .filter(|p| now_ms.saturating_sub(p.requested_at_ms) >= ttl_ms)
            .cloned()
            .collect()
    }

    /// Lifecycle state of `id`.
    pub fn state_of(
        &self,
        ledger: &ObservationLedger,
        id: ObservationId,
    ) -> Result<RevealState, LedgerError> {
        if ledger.get_decrypted(id)?.revealed {
            return Ok(RevealState::Revealed);
        }
        if self.by_observation.contains_key(&id) {
            return Ok(RevealState::RequestPending);
        }
        Ok(RevealState::Submitted)
    }

    /// Pending request for `id`, if any.
    pub fn pending_for(&self, id: ObservationId) -> Option<&PendingRevealRequest> {
        self.by_observation
            .get(&id)
            .and_then(|rid| self.by_request.get(rid))
    }

    /// Number of outstanding requests.
    pub fn pending_count(&self) -> usize {
        self.by_request.len()
    }

    /// Outstanding requests in request-id order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingRevealRequest> {
        self.by_request.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        access::ContributorPolicy,
        algebra::passthrough::PassthroughAlgebra,
        oracle::{keys::OracleKey, signing::reveal_signing_bytes_v1},
        types::{CipherFields, RegionCode},
    };

    const OWNER: ContributorId = ContributorId([1u8; 32]);

    struct Fixture {
        key: OracleKey,
        alg: PassthroughAlgebra,
        ledger: ObservationLedger,
        bridge: DecryptionOracleBridge,
        id: ObservationId,
    }

    fn fixture() -> Fixture {
        let key = OracleKey::generate().unwrap();
        let alg = PassthroughAlgebra::new(key.public_key());
        let mut ledger = ObservationLedger::new();
        let fields = CipherFields {
            brightness: PassthroughAlgebra::encrypt(21),
            latitude: PassthroughAlgebra::encrypt(52),
            longitude: PassthroughAlgebra::encrypt(13),
            timestamp: PassthroughAlgebra::encrypt(1_700_000_123),
        };
        let id = ledger
            .submit(&alg, fields, RegionCode::new("EU-1"), OWNER, 0)
            .unwrap();
        Fixture {
            key,
            alg,
            ledger,
            bridge: DecryptionOracleBridge::new(),
            id,
        }
    }

    fn answer(f: &Fixture, rid: &RequestId) -> (RevealedValues, RevealProof) {
        let p = f.bridge.by_request.get(rid).unwrap();
        let vals: Vec<u64> = p
            .ciphertexts
            .iter()
            .map(|c| PassthroughAlgebra::open(c).unwrap())
            .collect();
        let msg = reveal_signing_bytes_v1(rid, &p.ciphertexts, &vals).unwrap();
        (
            RevealedValues::from_array([vals[0], vals[1], vals[2], vals[3]]),
            f.key.sign(&msg),
        )
    }

    #[test]
    fn full_lifecycle() {
        let mut f = fixture();
        let policy = ContributorPolicy::new();
        assert_eq!(f.bridge.state_of(&f.ledger, f.id).unwrap(), RevealState::Submitted);

        let rid = f
            .bridge
            .request_reveal(&f.ledger, &f.alg, &policy, &OWNER, f.id, 5)
            .unwrap();
        assert_eq!(
            f.bridge.state_of(&f.ledger, f.id).unwrap(),
            RevealState::RequestPending
        );

        let (vals, proof) = answer(&f, &rid);
        let got = f
            .bridge
            .fulfill(&mut f.ledger, &f.alg, &rid, vals, &proof)
            .unwrap();
        assert_eq!(got, f.id);
        assert_eq!(f.bridge.state_of(&f.ledger, f.id).unwrap(), RevealState::Revealed);
        assert_eq!(f.ledger.get_decrypted(f.id).unwrap().values.brightness, 21);

        assert!(matches!(
            f.bridge.fulfill(&mut f.ledger, &f.alg, &rid, vals, &proof),
            Err(LedgerError::UnknownRequest)
        ));
        assert!(matches!(
            f.bridge.request_reveal(&f.ledger, &f.alg, &policy, &OWNER, f.id, 6),
            Err(LedgerError::AlreadyRevealed)
        ));
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let mut f = fixture();
        let policy = ContributorPolicy::new();
        let first = f
            .bridge
            .request_reveal(&f.ledger, &f.alg, &policy, &OWNER, f.id, 0)
            .unwrap();
        assert!(matches!(
            f.bridge.request_reveal(&f.ledger, &f.alg, &policy, &OWNER, f.id, 1),
            Err(LedgerError::RequestAlreadyPending)
        ));
        assert_eq!(f.bridge.pending_count(), 1);
        assert_eq!(f.bridge.pending_for(f.id).map(|p| p.request_id), Some(first));
    }

    #[test]
    fn bad_proof_mutates_nothing() {
        let mut f = fixture();
        let policy = ContributorPolicy::new();
        let rid = f
            .bridge
            .request_reveal(&f.ledger, &f.alg, &policy, &OWNER, f.id, 0)
            .unwrap();
        let (mut vals, proof) = answer(&f, &rid);
        vals.brightness += 1;

        let (ledger_before, bridge_before) = (f.ledger.clone(), f.bridge.clone());
        assert!(matches!(
            f.bridge.fulfill(&mut f.ledger, &f.alg, &rid, vals, &proof),
            Err(LedgerError::ProofVerificationFailed)
        ));
        assert_eq!(f.ledger, ledger_before);
        assert_eq!(f.bridge, bridge_before);
    }

    #[test]
    fn stranger_is_unauthorized() {
        let f = fixture();
        let r = f.bridge.stage_request(
            &f.ledger,
            &f.alg,
            &ContributorPolicy::new(),
            &ContributorId([7u8; 32]),
            f.id,
            0,
        );
        assert!(matches!(r, Err(LedgerError::Unauthorized)));
    }

    #[test]
    fn expiry_respects_ttl() {
        let mut f = fixture();
        let rid = f
            .bridge
            .request_reveal(&f.ledger, &f.alg, &ContributorPolicy::new(), &OWNER, f.id, 1_000)
            .unwrap();
        assert!(f.bridge.expired(1_500, 0).is_empty());
        assert!(f.bridge.expired(1_499, 500).is_empty());
        let stale = f.bridge.expired(1_500, 500);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].request_id, rid);
    }
}
