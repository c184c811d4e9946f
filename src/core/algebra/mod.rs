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

//! Homomorphic ciphertext capability.
//!
//! The ledger never interprets ciphertext bytes. Everything it needs from the
//! encryption scheme goes through [`CiphertextAlgebra`], so a production scheme
//! and the [`passthrough::PassthroughAlgebra`] test scheme are interchangeable.

pub mod passthrough;

use crate::core::types::{Ciphertext, EncryptedBool, RequestId, RevealProof};
use thiserror::Error;

/// Algebra errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgebraError {
    /// Ciphertext is not well-formed under this scheme.
    #[error("malformed ciphertext")]
    Malformed,
    /// Division by a zero public scalar.
    #[error("division by zero")]
    DivisionByZero,
    /// The reveal could not be handed to the oracle.
    #[error("reveal dispatch failed")]
    Dispatch,
    /// Randomness source failure.
    #[error("rng")]
    Rng,
}

/// Operations the ledger needs from a homomorphic scheme.
pub trait CiphertextAlgebra: Send + Sync {
    /// Check that `ct` is a well-formed integer ciphertext.
    fn validate(&self, ct: &Ciphertext) -> Result<(), AlgebraError>;

    /// Encrypt a public constant (no secrecy required).
    fn encrypt_trivial(&self, value: u64) -> Ciphertext;

    /// Homomorphic `a + b`.
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, AlgebraError>;

    /// Homomorphic `a / divisor` (integer division by a public scalar).
    fn div_scalar(&self, a: &Ciphertext, divisor: u64) -> Result<Ciphertext, AlgebraError>;

    /// Homomorphic `a > b`.
    fn gt(&self, a: &Ciphertext, b: &Ciphertext) -> Result<EncryptedBool, AlgebraError>;

    /// Hand `cts` to the decryption oracle and return the correlation token.
    /// Must not block on the oracle.
    fn begin_reveal(&self, cts: &[Ciphertext]) -> Result<RequestId, AlgebraError>;

    /// Whether `proof` shows `plaintexts` is the opening of exactly `cts`
    /// for the reveal issued as `request`.
    fn verify_reveal(
        &self,
        request: &RequestId,
        cts: &[Ciphertext],
        plaintexts: &[u64],
        proof: &RevealProof,
    ) -> bool;

    /// Encrypted zero, the initial value of every running sum.
    fn zero(&self) -> Ciphertext {
        self.encrypt_trivial(0)
    }
}
