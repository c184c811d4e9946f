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

//! Plaintext-passthrough scheme for tests and the simulated node.
//!
//! ## Ciphertext format
//! `MAGIC(2) || KIND(1) || VALUE(8, big-endian)`
//!
//! Values are carried in clear; integer arithmetic wraps like a fixed-width
//! encrypted integer. Reveal proofs are Ed25519 signatures by a pinned oracle
//! key over [`reveal_signing_bytes_v1`].

use crate::core::{
    algebra::{AlgebraError, CiphertextAlgebra},
    oracle::{
        keys::verify_pubkey_bytes,
        signing::reveal_signing_bytes_v1,
    },
    types::{Ciphertext, EncryptedBool, RequestId, RevealProof},
};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;

const MAGIC: &[u8; 2] = b"PT";
const KIND_UINT: u8 = 0;
const KIND_BOOL: u8 = 1;
const CT_LEN: usize = 11;

/// A reveal handed to the oracle.
#[derive(Clone, Debug)]
pub struct RevealDispatch {
    /// Correlation token.
    pub request_id: RequestId,
    /// Ciphertexts to open, in reveal order.
    pub ciphertexts: Vec<Ciphertext>,
}

/// Passthrough algebra bound to one oracle public key.
pub struct PassthroughAlgebra {
    oracle_key: [u8; 32],
    rng: SystemRandom,
    dispatch: Option<mpsc::UnboundedSender<RevealDispatch>>,
}

impl PassthroughAlgebra {
    /// Accept reveal proofs signed by `oracle_key` (Ed25519 public key bytes).
    pub fn new(oracle_key: [u8; 32]) -> Self {
        Self {
            oracle_key,
            rng: SystemRandom::new(),
            dispatch: None,
        }
    }

    /// Forward every reveal to `tx`. Without a dispatch channel reveals are
    /// only correlated, and the caller drives the oracle by hand.
    pub fn with_dispatch(mut self, tx: mpsc::UnboundedSender<RevealDispatch>) -> Self {
        self.dispatch = Some(tx);
        self
    }

    /// Encrypt `value` (contributor side).
    pub fn encrypt(value: u64) -> Ciphertext {
        encode(KIND_UINT, value)
    }

    /// Open an integer ciphertext (oracle and test-harness side).
    pub fn open(ct: &Ciphertext) -> Result<u64, AlgebraError> {
        decode(ct, KIND_UINT)
    }

    /// Open an encrypted boolean.
    pub fn open_bool(b: &EncryptedBool) -> Result<bool, AlgebraError> {
        decode(&b.0, KIND_BOOL).map(|v| v != 0)
    }
}

fn encode(kind: u8, value: u64) -> Ciphertext {
    let mut out = Vec::with_capacity(CT_LEN);
    out.extend_from_slice(MAGIC);
    out.push(kind);
    out.extend_from_slice(&value.to_be_bytes());
    Ciphertext(out)
}

fn decode(ct: &Ciphertext, kind: u8) -> Result<u64, AlgebraError> {
    let b = ct.0.as_slice();
    if b.len() != CT_LEN || &b[..2] != MAGIC || b[2] != kind {
        return Err(AlgebraError::Malformed);
    }
    let mut v = [0u8; 8];
    v.copy_from_slice(&b[3..]);
    Ok(u64::from_be_bytes(v))
}

impl CiphertextAlgebra for PassthroughAlgebra {
    fn validate(&self, ct: &Ciphertext) -> Result<(), AlgebraError> {
        decode(ct, KIND_UINT).map(|_| ())
    }

    fn encrypt_trivial(&self, value: u64) -> Ciphertext {
        encode(KIND_UINT, value)
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, AlgebraError> {
        let x = decode(a, KIND_UINT)?;
        let y = decode(b, KIND_UINT)?;
        Ok(encode(KIND_UINT, x.wrapping_add(y)))
    }

    fn div_scalar(&self, a: &Ciphertext, divisor: u64) -> Result<Ciphertext, AlgebraError> {
        if divisor == 0 {
            return Err(AlgebraError::DivisionByZero);
        }
        let x = decode(a, KIND_UINT)?;
        Ok(encode(KIND_UINT, x / divisor))
    }

    fn gt(&self, a: &Ciphertext, b: &Ciphertext) -> Result<EncryptedBool, AlgebraError> {
        let x = decode(a, KIND_UINT)?;
        let y = decode(b, KIND_UINT)?;
        Ok(EncryptedBool(encode(KIND_BOOL, u64::from(x > y))))
    }

    fn begin_reveal(&self, cts: &[Ciphertext]) -> Result<RequestId, AlgebraError> {
        for ct in cts {
            self.validate(ct)?;
        }
        let mut id = [0u8; 16];
        self.rng.fill(&mut id).map_err(|_| AlgebraError::Rng)?;
        let request_id = RequestId(id);

        if let Some(tx) = &self.dispatch {
            tx.send(RevealDispatch {
                request_id,
                ciphertexts: cts.to_vec(),
            })
            .map_err(|_| AlgebraError::Dispatch)?;
        }
        Ok(request_id)
    }

    fn verify_reveal(
        &self,
        request: &RequestId,
        cts: &[Ciphertext],
        plaintexts: &[u64],
        proof: &RevealProof,
    ) -> bool {
        if cts.len() != plaintexts.len() {
            return false;
        }
        for (ct, pt) in cts.iter().zip(plaintexts) {
            let Ok(opened) = decode(ct, KIND_UINT) else {
                return false;
            };
            if !bool::from(opened.to_be_bytes().ct_eq(&pt.to_be_bytes())) {
                return false;
            }
        }
        let Ok(msg) = reveal_signing_bytes_v1(request, cts, plaintexts) else {
            return false;
        };
        verify_pubkey_bytes(&self.oracle_key, &msg, proof).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::keys::OracleKey;

    #[test]
    fn arithmetic_and_comparison() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        let a = PassthroughAlgebra::encrypt(10);
        let b = PassthroughAlgebra::encrypt(4);
        let sum = alg.add(&a, &b).unwrap();
        assert_eq!(PassthroughAlgebra::open(&sum).unwrap(), 14);
        let q = alg.div_scalar(&sum, 3).unwrap();
        assert_eq!(PassthroughAlgebra::open(&q).unwrap(), 4);
        assert!(PassthroughAlgebra::open_bool(&alg.gt(&a, &b).unwrap()).unwrap());
        assert!(!PassthroughAlgebra::open_bool(&alg.gt(&a, &a).unwrap()).unwrap());
        assert_eq!(alg.div_scalar(&a, 0), Err(AlgebraError::DivisionByZero));
    }

    #[test]
    fn rejects_malformed_and_bool_as_uint() {
        let alg = PassthroughAlgebra::new([0u8; 32]);
        assert_eq!(alg.validate(&Ciphertext(vec![])), Err(AlgebraError::Malformed));
        let flag = alg
            .gt(&PassthroughAlgebra::encrypt(1), &PassthroughAlgebra::encrypt(0))
            .unwrap();
        assert_eq!(alg.validate(&flag.0), Err(AlgebraError::Malformed));
    }

    #[test]
    fn reveal_proof_binds_plaintext_and_request() {
        let key = OracleKey::generate().unwrap();
        let alg = PassthroughAlgebra::new(key.public_key());
        let cts = vec![PassthroughAlgebra::encrypt(5), PassthroughAlgebra::encrypt(6)];
        let rid = alg.begin_reveal(&cts).unwrap();

        let msg = reveal_signing_bytes_v1(&rid, &cts, &[5, 6]).unwrap();
        let proof = key.sign(&msg);
        assert!(alg.verify_reveal(&rid, &cts, &[5, 6], &proof));
        assert!(!alg.verify_reveal(&rid, &cts, &[5, 7], &proof));
        assert!(!alg.verify_reveal(&RequestId([9u8; 16]), &cts, &[5, 6], &proof));

        // Correct opening, but signed by someone else.
        let rogue = OracleKey::generate().unwrap();
        assert!(!alg.verify_reveal(&rid, &cts, &[5, 6], &rogue.sign(&msg)));
    }

    #[test]
    fn dispatch_is_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alg = PassthroughAlgebra::new([0u8; 32]).with_dispatch(tx);
        let cts = vec![PassthroughAlgebra::encrypt(1)];
        let rid = alg.begin_reveal(&cts).unwrap();
        let d = rx.try_recv().unwrap();
        assert_eq!(d.request_id, rid);
        assert_eq!(d.ciphertexts, cts);

        drop(rx);
        assert_eq!(alg.begin_reveal(&cts), Err(AlgebraError::Dispatch));
    }
}
