//! Adapters behind the domain ports: storage backends and the deterministic
//! sandbox providers.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
