use crate::errors::CacheError;
use crate::random::{EntropySource, Scrub, os_entropy, scrub};

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// What a clear did to the holder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Overwritten with entropy, then released
    Scrubbed { len: usize },
    /// Entropy was unavailable; overwritten with zeros, then released
    ZeroFilled { len: usize },
    /// Nothing left to clear
    AlreadyCleared,
}

/// Memory-safe container for sensitive bytes that scrubs them with entropy
/// before they are released.
///
/// The holder takes the caller's `Vec` as-is and never copies it. The buffer
/// is overwritten exactly once, either by [`CachedBytes::dispose`] or when the
/// holder is dropped, whichever comes first. Readers share a read lock and
/// the clear takes the write lock, so a reader sees the whole original
/// buffer or [`CacheError::UseAfterClear`], never a partially overwritten one.
pub struct CachedBytes {
    slot: RwLock<Option<Vec<u8>>>,
    entropy: Arc<dyn EntropySource>,
}

impl CachedBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_entropy(data, os_entropy())
    }

    /// Hold `data`, scrubbing it with `entropy` when cleared
    pub fn with_entropy(data: Vec<u8>, entropy: Arc<dyn EntropySource>) -> Self {
        log::trace!(target: "cached_bytes", "Holding {} bytes", data.len());
        Self {
            slot: RwLock::new(Some(data)),
            entropy,
        }
    }

    /// Borrow the held bytes.
    ///
    /// Views from several threads may coexist. The returned guard holds a
    /// read lock until it is dropped, so a concurrent
    /// [`dispose`](Self::dispose) waits for every outstanding view.
    ///
    /// While a view is alive on this thread, calling `dispose` (or anything
    /// that disposes, like [`ByteCache::remove`](crate::ByteCache::remove))
    /// deadlocks, and so may another `read` or [`with_bytes`](Self::with_bytes)
    /// once a disposer is queued. [`len`](Self::len),
    /// [`is_empty`](Self::is_empty) and [`is_cleared`](Self::is_cleared) stay
    /// safe to call.
    pub fn read(&self) -> Result<Exposed<'_>, CacheError> {
        RwLockReadGuard::try_map(self.slot.read(), |slot| slot.as_deref())
            .map(|inner| Exposed { inner })
            .map_err(|_| CacheError::UseAfterClear)
    }

    /// Run `f` against the held bytes, releasing the lock afterwards.
    /// Same locking rules as [`read`](Self::read).
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, CacheError> {
        let exposed = self.read()?;
        Ok(f(&exposed))
    }

    // Status accessors take the lock recursively so they work while the
    // calling thread holds a view and a disposer is waiting.

    pub fn len(&self) -> Result<usize, CacheError> {
        let slot = self.slot.read_recursive();
        slot.as_ref().map(Vec::len).ok_or(CacheError::UseAfterClear)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn is_cleared(&self) -> bool {
        self.slot.read_recursive().is_none()
    }

    /// Overwrite the buffer with entropy and release it. Safe to call again.
    ///
    /// Waits for every outstanding [`Exposed`] view, so it must not be called
    /// from a thread that holds one.
    pub fn dispose(&self) -> Disposal {
        let mut slot = self.slot.write();
        clear(&mut slot, self.entropy.as_ref())
    }
}

fn clear(slot: &mut Option<Vec<u8>>, entropy: &dyn EntropySource) -> Disposal {
    let Some(mut data) = slot.take() else {
        return Disposal::AlreadyCleared;
    };
    let len = data.len();

    // Spare capacity may hold stale bytes too; growing within capacity never reallocates
    data.resize(data.capacity(), 0);
    let outcome = scrub(&mut data, entropy);
    drop(data);

    log::trace!(target: "cached_bytes", "Cleared {} bytes ({:?})", len, outcome);
    match outcome {
        Scrub::Entropy => Disposal::Scrubbed { len },
        Scrub::ZeroFallback => Disposal::ZeroFilled { len },
    }
}

impl Drop for CachedBytes {
    fn drop(&mut self) {
        clear(self.slot.get_mut(), self.entropy.as_ref());
    }
}

impl From<Vec<u8>> for CachedBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for CachedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.try_read_recursive() {
            Some(slot) => match slot.as_ref() {
                Some(data) => write!(f, "CachedBytes(live, {} bytes)", data.len()),
                None => write!(f, "CachedBytes(cleared)"),
            },
            None => write!(f, "CachedBytes(in use)"),
        }
    }
}

/// Read-only view of a live holder's bytes
pub struct Exposed<'a> {
    inner: MappedRwLockReadGuard<'a, [u8]>,
}

impl Deref for Exposed<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl AsRef<[u8]> for Exposed<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl fmt::Debug for Exposed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exposed({} bytes)", self.inner.len())
    }
}
