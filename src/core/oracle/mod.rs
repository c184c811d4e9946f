#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Decryption oracle: request bridge, proof format, keys and the simulated service.

pub mod bridge;
pub mod keys;
pub mod service;
pub mod signing;
