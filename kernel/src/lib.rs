//! Archival kernel: the verification gates and deterministic engine of the
//! residual-analysis pipeline.
//!
//! # API Surface
//!
//! - [`environment::verify_environment`] -- exact-match the live environment against a pinned manifest
//! - [`preregistration::verify_preregistration`] -- check parameters against their published commitment
//! - [`context::guard_context`] -- refuse non-strict or non-file execution contexts
//! - [`engine::execute`] -- run the analysis on verified parameters
//!
//! # Module Dependency Direction
//!
//! `proof` ← `environment`, `preregistration`, `context` ← `engine`
//!
//! One-way only. `proof` depends on nothing internal. The kernel performs no
//! I/O; reading layout files and writing artifacts is the harness's job.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod context;
pub mod engine;
pub mod environment;
pub mod error;
pub mod preregistration;
pub mod proof;
