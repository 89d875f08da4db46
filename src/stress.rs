// src/stress.rs
use crate::errors::CacheError;
use crate::memory::CachedBytes;
use crate::random::random_bytes;

use std::sync::Barrier;
use std::thread;

/// Tally of what readers observed across all rounds
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StressReport {
    pub rounds: usize,
    pub full_reads: u64,
    pub cleared_reads: u64,
}

/// Race `readers` threads against a mid-flight `dispose` for `rounds` rounds.
///
/// Every view a reader gets must equal the payload; anything else is a
/// [`CacheError::TornRead`].
pub fn run(readers: usize, size: usize, rounds: usize) -> Result<StressReport, CacheError> {
    let mut report = StressReport::default();

    for round in 0..rounds {
        let expected = random_bytes(size)?;
        let holder = CachedBytes::new(expected.clone());
        let barrier = Barrier::new(readers + 1);

        let counts = thread::scope(|s| {
            let handles: Vec<_> = (0..readers)
                .map(|_| s.spawn(|| read_until_cleared(&holder, &expected, &barrier)))
                .collect();

            barrier.wait();
            thread::yield_now();
            holder.dispose();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let full: u64 = counts.iter().sum();
        log::debug!(
            target: "cached_bytes",
            "Round {}: {} full reads before clear",
            round,
            full
        );

        report.rounds += 1;
        report.full_reads += full;
        report.cleared_reads += readers as u64;
    }

    Ok(report)
}

fn read_until_cleared(
    holder: &CachedBytes,
    expected: &[u8],
    barrier: &Barrier,
) -> Result<u64, CacheError> {
    barrier.wait();
    let mut full = 0;
    loop {
        match holder.read() {
            Ok(view) => {
                if *view != *expected {
                    let differing = view.iter().zip(expected).filter(|(a, b)| a != b).count();
                    return Err(CacheError::TornRead(format!(
                        "{} of {} bytes differ from the original",
                        differing,
                        expected.len()
                    )));
                }
                full += 1;
            }
            Err(CacheError::UseAfterClear) => return Ok(full),
            Err(e) => return Err(e),
        }
    }
}
