#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Metrics and their HTTP exporter.

pub mod http;
pub mod metrics;
