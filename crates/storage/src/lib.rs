//! Storage layer for Lingua
//!
//! This crate provides the device-local key-value store and the
//! secure storage seam the session layer persists through.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod secure;

pub use kv::{KvConfig, KvError, KvStore};
pub use secure::{MemoryStorage, SecureStorage};
