//! Query layer: keyed, coalescing read cache with invalidation after writes.

pub mod cache;
pub mod keys;
pub mod retry;

pub use cache::QueryCache;
pub use keys::QueryKey;
pub use retry::RetryPolicy;
