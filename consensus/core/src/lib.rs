//! Core Radiant transaction types and their consensus encodings.

pub mod hashing;
pub mod tx;
