#![forbid(unsafe_code)]
#![deny(missing_docs)]
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

//! Oracle signing key: Ed25519 over PKCS#8, stored with private permissions.
//!
//! The ledger only ever holds the 32-byte public half; the secret half lives
//! with the (simulated) decryption oracle.

use crate::core::types::RevealProof;
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519},
};
use std::{fs, io::Write, path::Path};
use thiserror::Error;
use zeroize::Zeroize;

/// Oracle key errors.
#[derive(Debug, Error)]
pub enum OracleKeyError {
    /// Key file could not be read or written.
    #[error("io")]
    Io,
    /// Key bytes are not a valid Ed25519 PKCS#8 document.
    #[error("invalid key encoding")]
    InvalidKey,
    /// Signature rejected.
    #[error("bad signature")]
    BadSignature,
}

/// Ed25519 key used by the oracle to sign reveal proofs.
pub struct OracleKey {
    keypair: Ed25519KeyPair,
}

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
}

/// Atomic write to disk (best-effort fsync, then rename).
fn atomic_write_private(path: &Path, bytes: &[u8]) -> Result<(), OracleKeyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|_| OracleKeyError::Io)?;
    }

    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");

    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|_| OracleKeyError::Io)?;
        f.write_all(bytes).map_err(|_| OracleKeyError::Io)?;
        let _ = f.sync_all();
    }

    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path).map_err(|_| OracleKeyError::Io)?;
    set_private_perms_best_effort(path);
    Ok(())
}

impl OracleKey {
    /// Fresh in-memory key.
    pub fn generate() -> Result<Self, OracleKeyError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| OracleKeyError::InvalidKey)?;
        Self::from_pkcs8(pkcs8.as_ref())
    }

    /// Parse PKCS#8 bytes.
    pub fn from_pkcs8(bytes: &[u8]) -> Result<Self, OracleKeyError> {
        let keypair = Ed25519KeyPair::from_pkcs8(bytes).map_err(|_| OracleKeyError::InvalidKey)?;
        Ok(Self { keypair })
    }

    /// Load the key at `path`, or create and persist one.
    pub fn load_or_create(path: &Path) -> Result<Self, OracleKeyError> {
        if path.exists() {
            let mut bytes = fs::read(path).map_err(|_| OracleKeyError::Io)?;
            let key = Self::from_pkcs8(&bytes);
            bytes.zeroize();
            return key;
        }

        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| OracleKeyError::InvalidKey)?;
        let mut buf = pkcs8.as_ref().to_vec();
        let written = atomic_write_private(path, &buf);
        let key = Self::from_pkcs8(&buf);
        buf.zeroize();
        written?;
        key
    }

    /// Public key bytes to pin in the ledger's verifier.
    pub fn public_key(&self) -> [u8; 32] {
        let pk = self.keypair.public_key().as_ref();
        let mut out = [0u8; 32];
        out.copy_from_slice(pk);
        out
    }

    /// Sign a reveal payload.
    pub fn sign(&self, msg: &[u8]) -> RevealProof {
        RevealProof(self.keypair.sign(msg).as_ref().to_vec())
    }
}

/// Verify a reveal proof given raw public key bytes.
pub fn verify_pubkey_bytes(
    pk_bytes: &[u8; 32],
    msg: &[u8],
    proof: &RevealProof,
) -> Result<(), OracleKeyError> {
    // ring requires signature length 64 for Ed25519
    if proof.0.len() != 64 {
        return Err(OracleKeyError::BadSignature);
    }
    let pk = UnparsedPublicKey::new(&ED25519, pk_bytes);
    pk.verify(msg, &proof.0).map_err(|_| OracleKeyError::BadSignature)
}

/// Parse a pinned public key from 64 hex characters.
pub fn parse_public_key_hex(s: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(s.trim()).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Some(out)
}
