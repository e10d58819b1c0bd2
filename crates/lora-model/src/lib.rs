//! Domain types shared by the lora training workspace.
//!
//! Nothing in this crate performs I/O: it describes tasks, their lifecycle
//! states and the normalized signals reported by the job-execution service.
mod domain;
pub use domain::*;
