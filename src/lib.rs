//! In-memory holder for sensitive bytes.
//!
//! [`CachedBytes`] owns a buffer, hands out read access while live, and
//! overwrites the buffer with entropy exactly once, either on
//! [`CachedBytes::dispose`] or on drop. [`ByteCache`] keeps named holders.

pub mod cache;
pub mod cli;
pub mod errors;
pub mod input;
pub mod logging;
pub mod memory;
pub mod random;
pub mod stress;

pub use cache::ByteCache;
pub use errors::CacheError;
pub use memory::{CachedBytes, Disposal, Exposed};
pub use random::{EntropySource, OsEntropy, Scrub};
