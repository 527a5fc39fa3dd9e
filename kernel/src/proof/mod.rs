//! Proof module: canonical serialization and domain-separated hashing.
//!
//! Depends on nothing internal. Every other kernel module that commits to
//! bytes goes through here.

pub mod canon;
pub mod finite;
pub mod hash;
pub mod hash_domain;
