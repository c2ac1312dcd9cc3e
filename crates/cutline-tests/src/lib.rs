//! Integration test crate for Cutline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the session and export crates to verify they work together.

#[cfg(test)]
mod session;

#[cfg(test)]
mod export;
