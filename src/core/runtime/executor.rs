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

//! Ledger executor: the boundary the host environment calls into.
//!
//! Every mutating call is one transaction: stage against current state,
//! commit the touched keys to the durable store (if any) in a single sled
//! transaction, then apply in memory and emit notifications. An error at any
//! point before the apply leaves both the store and memory unchanged.

use crate::{
    core::{
        access::AccessControl,
        algebra::CiphertextAlgebra,
        error::LedgerError,
        events::{EventSink, LedgerEvent},
        ledger::{
            observation::ObservationLedger,
            region::{RegionAggregator, RegionEntry},
        },
        oracle::bridge::DecryptionOracleBridge,
        state::{ledger_store::LedgerStore, persistent_state::KvOp},
        types::{
            CipherFields, Ciphertext, ContributorId, DecryptedObservation, EncryptedBool,
            EncryptedObservation, ObservationId, RegionCode, RequestId, RevealProof, RevealState,
            RevealedValues,
        },
    },
    monitoring::metrics::Metrics,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};

/// Caller identity and clock, supplied by the host per call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Authenticated caller.
    pub caller: ContributorId,
    /// Host time, ms since UNIX epoch.
    pub now_ms: u64,
}

impl CallContext {
    /// Context with an explicit clock.
    pub fn new(caller: ContributorId, now_ms: u64) -> Self {
        Self { caller, now_ms }
    }

    /// Context stamped with wall-clock time.
    pub fn now(caller: ContributorId) -> Self {
        Self::new(caller, now_ms())
    }
}

/// Wall-clock ms since UNIX epoch (0 if the clock is before the epoch).
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Confidential measurement ledger.
pub struct LedgerExecutor<A: CiphertextAlgebra, C: AccessControl, E: EventSink> {
    algebra: A,
    access: C,
    events: E,
    ledger: ObservationLedger,
    regions: RegionAggregator,
    bridge: DecryptionOracleBridge,
    store: Option<LedgerStore>,
    metrics: Option<Arc<Metrics>>,
    reveal_ttl_ms: u64,
}

impl<A: CiphertextAlgebra, C: AccessControl, E: EventSink> LedgerExecutor<A, C, E> {
    /// In-memory executor.
    pub fn new(algebra: A, access: C, events: E) -> Self {
        Self {
            algebra,
            access,
            events,
            ledger: ObservationLedger::new(),
            regions: RegionAggregator::new(),
            bridge: DecryptionOracleBridge::new(),
            store: None,
            metrics: None,
            reveal_ttl_ms: 0,
        }
    }

    /// Executor backed by `store`, restored from its contents.
    pub fn open(store: LedgerStore, algebra: A, access: C, events: E) -> Result<Self, LedgerError> {
        let snap = store.load()?;
        info!(
            observations = snap.observations.len(),
            regions = snap.regions.len(),
            pending = snap.pending.len(),
            "ledger restored"
        );
        let mut out = Self::new(algebra, access, events);
        out.ledger = ObservationLedger::restore(snap.observations, snap.last_id);
        out.regions = RegionAggregator::restore(snap.regions);
        out.bridge = DecryptionOracleBridge::restore(snap.pending);
        out.store = Some(store);
        Ok(out)
    }

    /// Record metrics into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.regions.set(self.regions.registered().len() as i64);
        metrics.pending_reveals.set(self.bridge.pending_count() as i64);
        self.metrics = Some(metrics);
        self
    }

    /// Expire pending reveals after `ttl_ms` (0 disables expiry).
    pub fn with_reveal_ttl(mut self, ttl_ms: u64) -> Self {
        self.reveal_ttl_ms = ttl_ms;
        self
    }

    fn persist(&self, ops: Vec<KvOp>) -> Result<(), LedgerError> {
        match &self.store {
            Some(s) => s.commit(ops),
            None => Ok(()),
        }
    }

    fn sync_gauges(&self) {
        if let Some(m) = &self.metrics {
            m.regions.set(self.regions.registered().len() as i64);
            m.pending_reveals.set(self.bridge.pending_count() as i64);
        }
    }

    /// Store a new encrypted observation and fold its brightness into `region`.
    pub fn submit(
        &mut self,
        ctx: &CallContext,
        fields: CipherFields,
        region: RegionCode,
    ) -> Result<ObservationId, LedgerError> {
        let rec = self.ledger.stage_submit(
            &self.algebra,
            fields,
            region.clone(),
            ctx.caller,
            ctx.now_ms,
        )?;
        let entry: RegionEntry =
            self.regions
                .stage_accumulate(&self.algebra, &region, &rec.encrypted.fields.brightness)?;
        let id = rec.encrypted.id;
        let new_region = !self.regions.contains(&region);

        self.persist(vec![
            LedgerStore::put_observation(&rec)?,
            LedgerStore::put_region(&entry)?,
            LedgerStore::put_last_id(id.0),
        ])?;

        self.ledger.apply_submit(rec);
        self.regions.apply_entry(entry);

        info!(%id, region = %region, new_region, "observation submitted");
        self.events.emit(LedgerEvent::ObservationSubmitted {
            id,
            time_ms: ctx.now_ms,
        });
        self.events.emit(LedgerEvent::RegionUpdated {
            region_hash: region.hash(),
        });
        if let Some(m) = &self.metrics {
            m.observations_total.inc();
        }
        self.sync_gauges();
        Ok(id)
    }

    /// Ask the oracle to reveal observation `id` on behalf of the caller.
    pub fn request_reveal(
        &mut self,
        ctx: &CallContext,
        id: ObservationId,
    ) -> Result<RequestId, LedgerError> {
        let pending = match self.bridge.stage_request(
            &self.ledger,
            &self.algebra,
            &self.access,
            &ctx.caller,
            id,
            ctx.now_ms,
        ) {
            Ok(p) => p,
            Err(e) => {
                debug!(%id, caller = %ctx.caller, error = %e, "reveal request rejected");
                return Err(e);
            }
        };
        let request_id = pending.request_id;

        // The dispatch already left; if this commit fails its callback will
        // find no correlation and be rejected as unknown.
        self.persist(vec![LedgerStore::put_pending(&pending)?])?;
        self.bridge.apply_request(pending);

        info!(%id, request = %request_id, "decryption requested");
        self.events
            .emit(LedgerEvent::DecryptionRequested { id, request_id });
        if let Some(m) = &self.metrics {
            m.reveal_requests_total.inc();
        }
        self.sync_gauges();
        Ok(request_id)
    }

    /// Oracle callback. Caller identity is irrelevant; only the proof counts.
    pub fn fulfill(
        &mut self,
        request_id: &RequestId,
        values: RevealedValues,
        proof: &RevealProof,
    ) -> Result<(), LedgerError> {
        let staged = self.bridge.stage_fulfill(
            &self.ledger,
            &self.algebra,
            request_id,
            values,
            proof,
        );
        let (pending, record) = match staged {
            Ok(s) => s,
            Err(e) => {
                warn!(request = %request_id, error = %e, "oracle callback rejected");
                if let Some(m) = &self.metrics {
                    m.fulfill_rejected_total.inc();
                }
                return Err(e);
            }
        };

        self.persist(vec![
            LedgerStore::del_pending(request_id),
            LedgerStore::put_observation(&record)?,
        ])?;
        self.bridge.consume(request_id);
        self.ledger.apply_reveal(record);

        let id = pending.observation_id;
        info!(%id, request = %request_id, "observation decrypted");
        self.events.emit(LedgerEvent::ObservationDecrypted { id });
        if let Some(m) = &self.metrics {
            m.reveals_fulfilled_total.inc();
        }
        self.sync_gauges();
        Ok(())
    }

    /// Drop pending reveals older than the configured TTL.
    ///
    /// Late callbacks for dropped requests fail with `UnknownRequest`, and
    /// the observation can be requested again.
    pub fn expire_pending(&mut self, now_ms: u64) -> Result<Vec<RequestId>, LedgerError> {
        let stale = self.bridge.expired(now_ms, self.reveal_ttl_ms);
        if stale.is_empty() {
            return Ok(Vec::new());
        }
        self.persist(
            stale
                .iter()
                .map(|p| LedgerStore::del_pending(&p.request_id))
                .collect(),
        )?;

        let mut out = Vec::with_capacity(stale.len());
        for p in stale {
            self.bridge.consume(&p.request_id);
            warn!(id = %p.observation_id, request = %p.request_id, "reveal request expired");
            self.events.emit(LedgerEvent::RevealExpired {
                id: p.observation_id,
                request_id: p.request_id,
            });
            if let Some(m) = &self.metrics {
                m.reveals_expired_total.inc();
            }
            out.push(p.request_id);
        }
        self.sync_gauges();
        Ok(out)
    }

    /// Encrypted record `id`.
    pub fn get_encrypted(&self, id: ObservationId) -> Result<&EncryptedObservation, LedgerError> {
        self.ledger.get_encrypted(id)
    }

    /// Decrypted record `id` (all zero and `revealed = false` until revealed).
    pub fn get_decrypted(&self, id: ObservationId) -> Result<DecryptedObservation, LedgerError> {
        self.ledger.get_decrypted(id).copied()
    }

    /// Encrypted regional sum divided by the global observation count.
    pub fn regional_average(&self, region: &RegionCode) -> Result<Ciphertext, LedgerError> {
        self.regions
            .regional_average(&self.algebra, region, self.ledger.count())
    }

    /// Encrypted mean of arbitrary ciphertexts.
    pub fn aggregate(&self, values: &[Ciphertext]) -> Result<Ciphertext, LedgerError> {
        RegionAggregator::aggregate(&self.algebra, values)
    }

    /// Encrypted `a > b`.
    pub fn compare(&self, a: &Ciphertext, b: &Ciphertext) -> Result<EncryptedBool, LedgerError> {
        Ok(self.algebra.gt(a, b)?)
    }

    /// Encrypted `value > threshold` for a public threshold.
    pub fn check_threshold(
        &self,
        value: &Ciphertext,
        threshold: u64,
    ) -> Result<EncryptedBool, LedgerError> {
        let t = self.algebra.encrypt_trivial(threshold);
        Ok(self.algebra.gt(value, &t)?)
    }

    /// Region codes in registration order.
    pub fn registered_regions(&self) -> &[RegionCode] {
        self.regions.registered()
    }

    /// Total observations.
    pub fn observation_count(&self) -> u64 {
        self.ledger.count()
    }

    /// Reveal lifecycle of `id`.
    pub fn reveal_state(&self, id: ObservationId) -> Result<RevealState, LedgerError> {
        self.bridge.state_of(&self.ledger, id)
    }

    /// Observation ledger (read-only).
    pub fn ledger(&self) -> &ObservationLedger {
        &self.ledger
    }

    /// Region table (read-only).
    pub fn regions(&self) -> &RegionAggregator {
        &self.regions
    }

    /// Pending-request table (read-only).
    pub fn bridge(&self) -> &DecryptionOracleBridge {
        &self.bridge
    }
}
