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

//! Simulated decryption oracle.
//!
//! Receives reveal dispatches, opens the ciphertexts, signs the opening and
//! hands the callback back to the host on a separate channel. Each dispatch is
//! answered on its own task, so callbacks may arrive in any order.

#![forbid(unsafe_code)]

use crate::core::{
    algebra::{passthrough::PassthroughAlgebra, passthrough::RevealDispatch, AlgebraError},
    oracle::{keys::OracleKey, signing::reveal_signing_bytes_v1},
    types::{RequestId, RevealProof, RevealedValues},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Oracle callback payload, the arguments of `fulfill`.
#[derive(Clone, Debug)]
pub struct Fulfillment {
    /// Correlation token from the dispatch.
    pub request_id: RequestId,
    /// Opened values.
    pub values: RevealedValues,
    /// Signature binding values, ciphertexts and request id.
    pub proof: RevealProof,
}

/// Oracle runtime settings.
#[derive(Clone, Debug, Default)]
pub struct OracleServiceConfig {
    /// Simulated latency before each callback.
    pub delay: Duration,
}

/// Open and sign one dispatch.
pub fn answer(key: &OracleKey, dispatch: &RevealDispatch) -> Result<Fulfillment, AlgebraError> {
    let opened = dispatch
        .ciphertexts
        .iter()
        .map(PassthroughAlgebra::open)
        .collect::<Result<Vec<u64>, _>>()?;
    let values: [u64; 4] = opened
        .as_slice()
        .try_into()
        .map_err(|_| AlgebraError::Malformed)?;
    let msg = reveal_signing_bytes_v1(&dispatch.request_id, &dispatch.ciphertexts, &values)
        .map_err(|_| AlgebraError::Malformed)?;
    Ok(Fulfillment {
        request_id: dispatch.request_id,
        values: RevealedValues::from_array(values),
        proof: key.sign(&msg),
    })
}

/// Spawn the oracle loop. Ends when the dispatch channel closes.
pub fn spawn_oracle(
    key: OracleKey,
    cfg: OracleServiceConfig,
    mut dispatch_rx: mpsc::UnboundedReceiver<RevealDispatch>,
    callbacks: mpsc::Sender<Fulfillment>,
) -> tokio::task::JoinHandle<()> {
    let key = Arc::new(key);
    tokio::spawn(async move {
        while let Some(d) = dispatch_rx.recv().await {
            let key = key.clone();
            let callbacks = callbacks.clone();
            let delay = cfg.delay;
            tokio::spawn(async move {
                let f = match answer(&key, &d) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(request = %d.request_id, error = %e, "oracle cannot open dispatch");
                        return;
                    }
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(request = %f.request_id, "oracle callback ready");
                if callbacks.send(f).await.is_err() {
                    warn!("oracle callback channel closed");
                }
            });
        }
        debug!("oracle dispatch channel closed");
    })
}
