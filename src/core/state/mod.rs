#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Durable state.

pub mod ledger_store;
pub mod persistent_state;
