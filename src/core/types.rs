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

//! Ledger record types and canonical encoding helpers.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("serialization")]
    Serialize,
    /// Bytes are not a valid encoding.
    #[error("deserialization")]
    Deserialize,
    /// Encoding exceeds the record size cap.
    #[error("size limit exceeded")]
    TooLarge,
}

/// Upper bound for any single persisted record.
pub const MAX_RECORD_BYTES: usize = 64 * 1024;

/// Longest accepted region code, in UTF-8 bytes.
pub const MAX_REGION_CODE_BYTES: usize = 256;

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Encode, refusing output larger than `max` so that every stored record can
/// be read back by [`decode_canonical_limited`].
pub fn encode_canonical_limited<T: Serialize>(v: &T, max: usize) -> Result<Vec<u8>, CodecError> {
    let bytes = encode_canonical(v)?;
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    Ok(bytes)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    // The deserializer limit also caps length-prefixed containers inside the payload.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// 256-bit hash type (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct H256([u8; 32]);

impl H256 {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }
    /// Return bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
    /// SHA-256 of `data`.
    pub fn digest(data: &[u8]) -> Self {
        let d = ring::digest::digest(&ring::digest::SHA256, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(d.as_ref());
        Self(out)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Observation identity. Assigned sequentially from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationId(pub u64);

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contributor identity (32 bytes, e.g. an Ed25519 public key or account hash).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContributorId(pub [u8; 32]);

impl ContributorId {
    /// Parse from 64 hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Plaintext region identifier. Not sensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionCode(pub String);

impl RegionCode {
    /// Build from anything string-like.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
    /// Label used in outward notifications.
    pub fn hash(&self) -> H256 {
        H256::digest(self.0.as_bytes())
    }
    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Whether the code fits [`MAX_REGION_CODE_BYTES`].
    pub fn is_within_limit(&self) -> bool {
        self.0.len() <= MAX_REGION_CODE_BYTES
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reveal correlation token issued by the ciphertext algebra.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub [u8; 16]);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Opaque ciphertext handle. Interpretation belongs to the algebra.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(pub Vec<u8>);

/// Encrypted boolean produced by homomorphic comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBool(pub Ciphertext);

/// Reveal proof bytes (Ed25519 signature for the passthrough scheme).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealProof(pub Vec<u8>);

/// The four encrypted measurement fields of one observation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherFields {
    /// Sky brightness.
    pub brightness: Ciphertext,
    /// Latitude.
    pub latitude: Ciphertext,
    /// Longitude.
    pub longitude: Ciphertext,
    /// Measurement timestamp.
    pub timestamp: Ciphertext,
}

impl CipherFields {
    /// Fields in canonical reveal order.
    pub fn to_vec(&self) -> Vec<Ciphertext> {
        vec![
            self.brightness.clone(),
            self.latitude.clone(),
            self.longitude.clone(),
            self.timestamp.clone(),
        ]
    }
}

/// Plaintext opening of [`CipherFields`], same field order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedValues {
    /// Sky brightness.
    pub brightness: u64,
    /// Latitude.
    pub latitude: u64,
    /// Longitude.
    pub longitude: u64,
    /// Measurement timestamp.
    pub timestamp: u64,
}

impl RevealedValues {
    /// Values in canonical reveal order.
    pub fn to_array(&self) -> [u64; 4] {
        [self.brightness, self.latitude, self.longitude, self.timestamp]
    }

    /// Inverse of [`RevealedValues::to_array`].
    pub fn from_array(v: [u64; 4]) -> Self {
        Self {
            brightness: v[0],
            latitude: v[1],
            longitude: v[2],
            timestamp: v[3],
        }
    }
}

/// Submitted observation. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObservation {
    /// Identity.
    pub id: ObservationId,
    /// Encrypted measurement.
    pub fields: CipherFields,
    /// Submission time, ms since UNIX epoch.
    pub submitted_at_ms: u64,
    /// Submitting contributor.
    pub contributor: ContributorId,
    /// Region the observation was registered under.
    pub region: RegionCode,
}

/// Decrypted companion record. `revealed` only ever goes false -> true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedObservation {
    /// Opened values (all zero until revealed).
    pub values: RevealedValues,
    /// Whether the reveal protocol completed.
    pub revealed: bool,
}

/// Reveal lifecycle of one observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealState {
    /// No reveal requested yet (or the last request expired).
    Submitted,
    /// A reveal request awaits its oracle callback.
    RequestPending,
    /// Terminal.
    Revealed,
}
