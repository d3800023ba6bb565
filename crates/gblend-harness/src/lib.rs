#![forbid(unsafe_code)]

//! Diagnostic driver for the `gblend` blend cache.
//!
//! - [`cli`]: flag and environment parsing.
//! - [`workload`]: a seeded, reproducible blending workload and its report.
//!
//! # Running
//!
//! ```sh
//! cargo run -p gblend-harness -- --gamma=2.2 --pairs=300 --json
//! GBLEND_KEY_COUNT=64 cargo run -p gblend-harness -- --channels
//! ```

pub mod cli;
pub mod workload;
