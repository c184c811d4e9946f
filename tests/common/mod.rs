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

#![allow(dead_code)]

use skyglow::core::{
    access::ContributorPolicy,
    algebra::passthrough::{PassthroughAlgebra, RevealDispatch},
    events::RecordingEvents,
    oracle::{keys::OracleKey, service::{answer, Fulfillment}},
    runtime::executor::{CallContext, LedgerExecutor},
    types::{CipherFields, ContributorId, ObservationId, RequestId},
};
use std::sync::Arc;

pub type TestLedger = LedgerExecutor<PassthroughAlgebra, ContributorPolicy, Arc<RecordingEvents>>;

pub struct Harness {
    pub exec: TestLedger,
    pub oracle: OracleKey,
    pub events: Arc<RecordingEvents>,
}

pub fn alice() -> ContributorId {
    ContributorId([0xA1; 32])
}

pub fn bob() -> ContributorId {
    ContributorId([0xB0; 32])
}

pub fn ctx(who: ContributorId, now_ms: u64) -> CallContext {
    CallContext::new(who, now_ms)
}

pub fn fields(brightness: u64, lat: u64, lon: u64, ts: u64) -> CipherFields {
    CipherFields {
        brightness: PassthroughAlgebra::encrypt(brightness),
        latitude: PassthroughAlgebra::encrypt(lat),
        longitude: PassthroughAlgebra::encrypt(lon),
        timestamp: PassthroughAlgebra::encrypt(ts),
    }
}

/// In-memory ledger that only correlates reveals; tests play the oracle.
pub fn harness() -> Harness {
    harness_with_ttl(0)
}

pub fn harness_with_ttl(ttl_ms: u64) -> Harness {
    let oracle = OracleKey::generate().unwrap();
    let events = Arc::new(RecordingEvents::default());
    let exec = LedgerExecutor::new(
        PassthroughAlgebra::new(oracle.public_key()),
        ContributorPolicy::new(),
        events.clone(),
    )
    .with_reveal_ttl(ttl_ms);
    Harness {
        exec,
        oracle,
        events,
    }
}

/// What the oracle would send back for `request_id` over observation `id`.
pub fn oracle_answer(h: &Harness, id: ObservationId, request_id: RequestId) -> Fulfillment {
    let ciphertexts = h.exec.get_encrypted(id).unwrap().fields.to_vec();
    answer(
        &h.oracle,
        &RevealDispatch {
            request_id,
            ciphertexts,
        },
    )
    .unwrap()
}
