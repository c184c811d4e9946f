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

//! Skyglow - confidential night-sky measurement ledger.
//!
//! This crate provides:
//! - An append-only ledger of homomorphically encrypted observations
//! - Regional aggregation over ciphertexts (sums, averages, comparisons)
//! - An asynchronous decryption-oracle protocol with verified, replay-safe callbacks
//! - Durable sled-backed state, Prometheus metrics and structured logging

/// Node configuration.
pub mod config;
/// Ledger core (types, algebra, ledger tables, oracle bridge, state).
pub mod core;
/// Observability (metrics and the HTTP exporter).
pub mod monitoring;
