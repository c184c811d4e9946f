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

//! Ledger error kinds surfaced to the host as transaction rejections.

use crate::core::{
    algebra::AlgebraError, state::persistent_state::StateError, types::CodecError,
};
use thiserror::Error;

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Unknown observation id.
    #[error("observation not found")]
    NotFound,
    /// The observation is already revealed.
    #[error("observation already revealed")]
    AlreadyRevealed,
    /// A reveal request for the observation is still awaiting its callback.
    #[error("reveal request already pending")]
    RequestAlreadyPending,
    /// Unseen, consumed, or expired request id.
    #[error("unknown reveal request")]
    UnknownRequest,
    /// Reveal proof does not bind the plaintext to the dispatched ciphertexts.
    #[error("reveal proof verification failed")]
    ProofVerificationFailed,
    /// Caller may not request this reveal.
    #[error("unauthorized")]
    Unauthorized,
    /// Aggregation over zero values.
    #[error("empty input")]
    EmptyInput,
    /// Unregistered region code.
    #[error("region not found")]
    RegionNotFound,
    /// Region code longer than `MAX_REGION_CODE_BYTES`.
    #[error("region code too long")]
    RegionCodeTooLong,
    /// Ciphertext rejected by the algebra.
    #[error("malformed ciphertext")]
    MalformedCiphertext,
    /// No observation ids left.
    #[error("observation id space exhausted")]
    IdExhausted,
    /// Homomorphic operation failed.
    #[error("algebra: {0}")]
    Algebra(AlgebraError),
    /// Durable store failure.
    #[error("storage: {0}")]
    Storage(#[from] StateError),
    /// Record encoding failure.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

impl From<AlgebraError> for LedgerError {
    fn from(e: AlgebraError) -> Self {
        match e {
            AlgebraError::Malformed => LedgerError::MalformedCiphertext,
            other => LedgerError::Algebra(other),
        }
    }
}
