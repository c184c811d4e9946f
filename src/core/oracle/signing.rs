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

//! Domain-separated signing bytes for reveal proofs.

use crate::core::types::{encode_canonical, Ciphertext, RequestId};
use thiserror::Error;

/// Signing error.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Ciphertext list could not be encoded.
    #[error("codec")]
    Codec,
}

/// Reveal payload: domain || request_id || canonical(ciphertexts) || count || plaintexts
///
/// Binding the ciphertext bytes (not just the observation id) means a proof
/// for one ciphertext set can never open another.
pub fn reveal_signing_bytes_v1(
    request_id: &RequestId,
    ciphertexts: &[Ciphertext],
    plaintexts: &[u64],
) -> Result<Vec<u8>, SigningError> {
    let cb = encode_canonical(&ciphertexts).map_err(|_| SigningError::Codec)?;
    let mut out = Vec::with_capacity(24 + 16 + cb.len() + 8 + 8 * plaintexts.len());
    out.extend_from_slice(b"Skyglow-Reveal-v1");
    out.extend_from_slice(&request_id.0);
    out.extend_from_slice(&cb);
    out.extend_from_slice(&(plaintexts.len() as u64).to_be_bytes());
    for p in plaintexts {
        out.extend_from_slice(&p.to_be_bytes());
    }
    Ok(out)
}
