//! Checks on what heap blocks still contain when they are handed back to
//! the system allocator.

use cached_bytes::input::{self, read_secret};
use cached_bytes::{CacheError, CachedBytes, Disposal, EntropySource};

use parking_lot::Mutex;
use std::alloc::{GlobalAlloc, Layout, System};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use tempfile::TempDir;

const MARKER: &[u8; 16] = b"\xC3stale-secret!\x5A\xA5";

const UNSEEN: u8 = 0;
const ZEROED: u8 = 1;
const DIRTY: u8 = 2;

/// Tests share the allocator counters
static SERIAL: Mutex<()> = Mutex::new(());

static SCANNING: AtomicBool = AtomicBool::new(false);
static STALE_BLOCKS: AtomicUsize = AtomicUsize::new(0);
static WATCHED: AtomicUsize = AtomicUsize::new(0);
static WATCHED_STATE: AtomicU8 = AtomicU8::new(UNSEEN);

/// System allocator that looks at every block before freeing it.
/// Reallocation goes through the default alloc-copy-dealloc path, so moved
/// blocks are inspected too.
struct Inspecting;

unsafe impl GlobalAlloc for Inspecting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let block = unsafe { std::slice::from_raw_parts(ptr, layout.size()) };

        if SCANNING.load(Ordering::SeqCst) && block.windows(MARKER.len()).any(|w| w == MARKER) {
            STALE_BLOCKS.fetch_add(1, Ordering::SeqCst);
        }

        if WATCHED
            .compare_exchange(ptr as usize, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let state = if block.iter().all(|b| *b == 0) {
                ZEROED
            } else {
                DIRTY
            };
            WATCHED_STATE.store(state, Ordering::SeqCst);
        }

        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: Inspecting = Inspecting;

/// Count freed blocks still holding the marker while `f` runs
fn stale_blocks_during<R>(f: impl FnOnce() -> R) -> (R, usize) {
    STALE_BLOCKS.store(0, Ordering::SeqCst);
    SCANNING.store(true, Ordering::SeqCst);
    let result = f();
    SCANNING.store(false, Ordering::SeqCst);
    (result, STALE_BLOCKS.load(Ordering::SeqCst))
}

fn marker_payload(len: usize) -> Vec<u8> {
    MARKER.iter().copied().cycle().take(len).collect()
}

/// Writes half the buffer, then gives up
struct HalfThenFail;

impl EntropySource for HalfThenFail {
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), CacheError> {
        WATCHED.store(buf.as_ptr() as usize, Ordering::SeqCst);
        let half = buf.len() / 2;
        buf[..half].fill(0xAA);
        Err(CacheError::Entropy("entropy device went away".to_string()))
    }
}

#[test]
fn test_streamed_input_leaves_no_stale_copies() {
    let _serial = SERIAL.lock();
    let payload = marker_payload(128 * 1024);

    // Starts from a single chunk of capacity, so the buffer has to grow
    let (loaded, during_load) = stale_blocks_during(|| read_secret(&payload[..], 0).unwrap());
    assert_eq!(during_load, 0);
    assert_eq!(loaded.len(), payload.len());
    assert!(loaded == payload);

    let (disposal, during_holder) = stale_blocks_during(|| {
        let holder = CachedBytes::new(loaded);
        holder.dispose()
    });
    assert_eq!(disposal, Disposal::Scrubbed { len: payload.len() });
    assert_eq!(during_holder, 0);
}

#[test]
fn test_file_input_leaves_no_stale_copies() {
    let _serial = SERIAL.lock();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("secret.bin");
    let payload = marker_payload(40 * 1024 + 3);
    fs::write(&path, &payload).unwrap();
    let arg = format!("@{}", path.display());

    let (disposal, stale) = stale_blocks_during(|| {
        let holder = CachedBytes::new(input::load(&arg).unwrap());
        assert_eq!(holder.len().unwrap(), payload.len());
        holder.dispose()
    });

    assert_eq!(disposal, Disposal::Scrubbed { len: payload.len() });
    assert_eq!(stale, 0);
}

#[test]
fn test_failed_entropy_leaves_holder_allocation_zeroed() {
    let _serial = SERIAL.lock();
    WATCHED_STATE.store(UNSEEN, Ordering::SeqCst);

    let holder = CachedBytes::with_entropy(vec![0x41; 4096], Arc::new(HalfThenFail));
    assert_eq!(holder.dispose(), Disposal::ZeroFilled { len: 4096 });

    // The holder's own allocation was freed all-zero: no original bytes and
    // none of the half-written entropy survived
    assert_eq!(WATCHED_STATE.load(Ordering::SeqCst), ZEROED);
    assert!(matches!(holder.read(), Err(CacheError::UseAfterClear)));
}
