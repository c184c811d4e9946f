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

//! Create (or reuse) the oracle signing key and print its public key for
//! `oracle.public_key_hex`.

use anyhow::{Context, Result};
use skyglow::core::oracle::keys::OracleKey;
use std::path::PathBuf;

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let mut key_path = PathBuf::from(out_dir);
    key_path.push("oracle.key");

    let key = OracleKey::load_or_create(&key_path)
        .with_context(|| format!("oracle key at {}", key_path.display()))?;
    println!("{}", hex::encode(key.public_key()));
    Ok(())
}
