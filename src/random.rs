// src/random.rs
use crate::errors::CacheError;

use getrandom::fill;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::sync::atomic::{Ordering, compiler_fence};
use zeroize::Zeroize;

/// Process-wide OS entropy handle shared by every holder
static OS_ENTROPY: Lazy<Arc<dyn EntropySource>> =
    Lazy::new(|| Arc::new(OsEntropy) as Arc<dyn EntropySource>);

/// Source of unpredictable bytes used to overwrite sensitive memory.
///
/// Implementations are shared between holders and may be called from many
/// threads at once. Zero-length buffers must be accepted.
pub trait EntropySource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), CacheError>;
}

/// Entropy straight from the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), CacheError> {
        fill(buf)?;
        Ok(())
    }
}

/// Shared handle to the OS entropy source
pub fn os_entropy() -> Arc<dyn EntropySource> {
    Arc::clone(&OS_ENTROPY)
}

/// How a buffer ended up overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scrub {
    Entropy,
    ZeroFallback,
}

/// Overwrite every byte of `buf`. Falls back to zeros if the source fails.
pub fn scrub(buf: &mut [u8], source: &dyn EntropySource) -> Scrub {
    let outcome = match source.fill_bytes(buf) {
        Ok(()) => Scrub::Entropy,
        Err(e) => {
            log::warn!(
                target: "cached_bytes",
                "Entropy unavailable, zero-filling {} bytes instead: {}",
                buf.len(),
                e
            );
            // The source may have written part of the buffer before failing
            buf.zeroize();
            Scrub::ZeroFallback
        }
    };
    compiler_fence(Ordering::SeqCst);
    outcome
}

/// Fresh random bytes of the given length
pub fn random_bytes(length: usize) -> Result<Vec<u8>, CacheError> {
    let mut buffer = vec![0u8; length];
    OsEntropy.fill_bytes(&mut buffer)?;
    Ok(buffer)
}
