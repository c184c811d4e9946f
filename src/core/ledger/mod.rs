#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Observation and region tables.

pub mod observation;
pub mod region;
