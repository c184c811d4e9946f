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

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Accepted observations.
    pub observations_total: IntCounter,
    /// Dispatched reveal requests.
    pub reveal_requests_total: IntCounter,
    /// Accepted oracle callbacks.
    pub reveals_fulfilled_total: IntCounter,
    /// Rejected oracle callbacks (unknown request, bad proof, ...).
    pub fulfill_rejected_total: IntCounter,
    /// Pending requests dropped by TTL.
    pub reveals_expired_total: IntCounter,
    /// Outstanding reveal requests.
    pub pending_reveals: IntGauge,
    /// Registered regions.
    pub regions: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let c = IntCounter::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(c)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let g = IntGauge::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(g.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(g)
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let observations_total =
            counter(&registry, "skyglow_observations_total", "Accepted observations")?;
        let reveal_requests_total = counter(
            &registry,
            "skyglow_reveal_requests_total",
            "Dispatched reveal requests",
        )?;
        let reveals_fulfilled_total = counter(
            &registry,
            "skyglow_reveals_fulfilled_total",
            "Accepted oracle callbacks",
        )?;
        let fulfill_rejected_total = counter(
            &registry,
            "skyglow_fulfill_rejected_total",
            "Rejected oracle callbacks",
        )?;
        let reveals_expired_total = counter(
            &registry,
            "skyglow_reveals_expired_total",
            "Pending reveals dropped by TTL",
        )?;
        let pending_reveals = gauge(&registry, "skyglow_pending_reveals", "Outstanding reveals")?;
        let regions = gauge(&registry, "skyglow_regions", "Registered regions")?;

        Ok(Self {
            registry,
            observations_total,
            reveal_requests_total,
            reveals_fulfilled_total,
            fulfill_rejected_total,
            reveals_expired_total,
            pending_reveals,
            regions,
        })
    }

    /// Prometheus text exposition of the registry.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|_| MetricsError::Prom)?;
        String::from_utf8(buf).map_err(|_| MetricsError::Prom)
    }
}
