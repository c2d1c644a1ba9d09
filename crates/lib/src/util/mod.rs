//! Shared utilities.
//!
//! Content hashing used for unit identities.

pub mod hash;
