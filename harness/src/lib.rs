//! Archival harness: orchestration and I/O around the kernel.
//!
//! The harness loads the archival layout, resolves the live environment,
//! captures the run context, drives the kernel gates and engine in fail-fast
//! order, and writes the forensic artifact and audit record.
//!
//! The harness does NOT implement verification or analysis logic; it
//! delegates to the kernel.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod artifact;
pub mod artifact_dir;
pub mod error;
pub mod layout;
pub mod obs;
pub mod probe;
pub mod runner;
pub mod telemetry;
