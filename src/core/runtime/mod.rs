#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Transaction execution.

pub mod executor;
