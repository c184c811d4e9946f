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

//! Reveal authorization.

use crate::core::types::{ContributorId, EncryptedObservation};
use std::collections::BTreeSet;

/// Decides who may request the reveal of an observation. Must be pure.
pub trait AccessControl: Send + Sync {
    /// Whether `requester` may reveal `observation`.
    fn authorize(&self, requester: &ContributorId, observation: &EncryptedObservation) -> bool;
}

/// The original contributor, or any configured delegate.
#[derive(Clone, Debug, Default)]
pub struct ContributorPolicy {
    delegates: BTreeSet<ContributorId>,
}

impl ContributorPolicy {
    /// Contributor-only, no delegates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant reveal rights over every observation to `delegates`.
    pub fn with_delegates(delegates: impl IntoIterator<Item = ContributorId>) -> Self {
        Self {
            delegates: delegates.into_iter().collect(),
        }
    }
}

impl AccessControl for ContributorPolicy {
    fn authorize(&self, requester: &ContributorId, observation: &EncryptedObservation) -> bool {
        *requester == observation.contributor || self.delegates.contains(requester)
    }
}

/// Anyone may request any reveal.
#[derive(Clone, Debug, Default)]
pub struct OpenPolicy;

impl AccessControl for OpenPolicy {
    fn authorize(&self, _requester: &ContributorId, _observation: &EncryptedObservation) -> bool {
        true
    }
}

/// Policy chosen at startup from configuration.
#[derive(Clone, Debug)]
pub enum AccessPolicy {
    /// See [`ContributorPolicy`].
    Contributor(ContributorPolicy),
    /// See [`OpenPolicy`].
    Open(OpenPolicy),
}

impl AccessControl for AccessPolicy {
    fn authorize(&self, requester: &ContributorId, observation: &EncryptedObservation) -> bool {
        match self {
            AccessPolicy::Contributor(p) => p.authorize(requester, observation),
            AccessPolicy::Open(p) => p.authorize(requester, observation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algebra::passthrough::PassthroughAlgebra;
    use crate::core::types::{CipherFields, ObservationId, RegionCode};

    fn obs(owner: u8) -> EncryptedObservation {
        let z = PassthroughAlgebra::encrypt(0);
        EncryptedObservation {
            id: ObservationId(1),
            fields: CipherFields {
                brightness: z.clone(),
                latitude: z.clone(),
                longitude: z.clone(),
                timestamp: z,
            },
            submitted_at_ms: 0,
            contributor: ContributorId([owner; 32]),
            region: RegionCode::new("EU-1"),
        }
    }

    #[test]
    fn contributor_and_delegates_only() {
        let o = obs(1);
        let p = ContributorPolicy::with_delegates([ContributorId([9u8; 32])]);
        assert!(p.authorize(&ContributorId([1u8; 32]), &o));
        assert!(p.authorize(&ContributorId([9u8; 32]), &o));
        assert!(!p.authorize(&ContributorId([2u8; 32]), &o));
    }

    #[test]
    fn open_policy_allows_all() {
        let p = AccessPolicy::Open(OpenPolicy);
        assert!(p.authorize(&ContributorId([2u8; 32]), &obs(1)));
    }
}
