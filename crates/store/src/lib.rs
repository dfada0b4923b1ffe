//! Durable record store boundary.
//!
//! Every component of the engine reaches the key-value store through the
//! narrow [`RecordStore`] trait: opaque JSON records by key plus ordered
//! string lists for queues and logs. There is no compare-and-swap; a
//! read-modify-write by two overlapping invocations is last-writer-wins.
//!
//! ## Implementations
//!
//! - [`InMemoryRecordStore`]: process-local, used by tests and local runs
//! - `RedisRecordStore` (feature `redis`): plain GET/SET and list commands

pub mod index;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod traits;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisRecordStore;
pub use traits::{RecordStore, RecordStoreExt, StoreError};
