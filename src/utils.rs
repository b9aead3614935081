//! Common utilities used across the crate.
//!
//! This module provides the range-splitting work dispatcher that every hot
//! loop of the training engine goes through.
//!
//! # Thread count semantics
//!
//! - `0` = no worker pool: the range callback runs once, synchronously, on the
//!   full range in the calling thread.
//! - `n > 0` = the range `[0, N)` is split into at most `n` contiguous chunks,
//!   each processed by a worker of a dedicated `rayon` pool of `n` threads.
//!
//! Chunks are disjoint, so callbacks that write only to the rows of their own
//! chunk never need locking, and the result of a pass does not depend on the
//! number of threads or on scheduling order.

use std::ops::Range;

use rayon::prelude::*;

// =============================================================================
// Range Splitting
// =============================================================================

/// Length of each chunk when splitting `total` items into `n_chunks` pieces.
///
/// Always at least 1.
#[inline]
pub fn chunk_len(total: usize, n_chunks: usize) -> usize {
    total.div_ceil(n_chunks.max(1)).max(1)
}

/// Split `[0, total)` into at most `n_chunks` contiguous, disjoint ranges.
///
/// The ranges are returned in increasing order and cover `[0, total)` exactly.
/// An empty range yields no chunks.
pub fn split_range(total: usize, n_chunks: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let chunk = chunk_len(total, n_chunks);
    (0..total)
        .step_by(chunk)
        .map(|lo| lo..(lo + chunk).min(total))
        .collect()
}

// =============================================================================
// ThreadLoop
// =============================================================================

/// Range-parallel dispatcher backed by an optional dedicated thread pool.
///
/// Created once per training session and reused by every pass, so the pool
/// is not rebuilt on each call.
///
/// # Example
///
/// ```
/// use visioner::utils::ThreadLoop;
///
/// let threads = ThreadLoop::new(2).unwrap();
/// let mut squares = vec![0usize; 10];
/// threads.for_rows_mut(&mut squares, 1, |range, rows| {
///     for (i, v) in range.zip(rows.iter_mut()) {
///         *v = i * i;
///     }
/// });
/// assert_eq!(squares[9], 81);
/// ```
#[derive(Debug)]
pub struct ThreadLoop {
    threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl ThreadLoop {
    /// Create a dispatcher with the given number of worker threads.
    ///
    /// `0` disables the pool: every call runs synchronously.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = if threads == 0 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("visioner-worker-{i}"))
                    .build()?,
            )
        };
        Ok(Self { threads, pool })
    }

    /// A dispatcher without worker threads.
    pub fn sequential() -> Self {
        Self {
            threads: 0,
            pool: None,
        }
    }

    /// Requested number of worker threads (0 = synchronous).
    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns `true` if calls are dispatched to a worker pool.
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Invoke `f` over disjoint contiguous ranges covering `[0, total)`.
    ///
    /// Blocks until every range has been processed.
    pub fn for_ranges<F>(&self, total: usize, f: F)
    where
        F: Fn(Range<usize>) + Sync + Send,
    {
        match &self.pool {
            None => f(0..total),
            Some(pool) => {
                let ranges = split_range(total, self.threads);
                pool.install(|| ranges.into_par_iter().for_each(|range| f(range)));
            }
        }
    }

    /// Map every chunk of `[0, total)` to a value.
    ///
    /// The results are returned in range order, whatever the scheduling.
    pub fn map_ranges<R, F>(&self, total: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Range<usize>) -> R + Sync + Send,
    {
        match &self.pool {
            None => vec![f(0..total)],
            Some(pool) => {
                let ranges = split_range(total, self.threads);
                pool.install(|| ranges.into_par_iter().map(|range| f(range)).collect())
            }
        }
    }

    /// Process a row-major buffer in chunks of whole rows.
    ///
    /// `data` holds `data.len() / row_len` rows of `row_len` elements. Each
    /// invocation of `f` receives its row range and the mutable slice holding
    /// exactly those rows.
    pub fn for_rows_mut<T, F>(&self, data: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(Range<usize>, &mut [T]) + Sync + Send,
    {
        debug_assert!(row_len > 0, "row_len must be positive");
        debug_assert_eq!(data.len() % row_len, 0, "buffer must hold whole rows");

        let total = data.len() / row_len;
        match &self.pool {
            None => f(0..total, data),
            Some(_) if total == 0 => {}
            Some(pool) => {
                let chunk = chunk_len(total, self.threads);
                pool.install(|| {
                    data.par_chunks_mut(chunk * row_len)
                        .enumerate()
                        .for_each(|(i, rows)| {
                            let lo = i * chunk;
                            f(lo..lo + rows.len() / row_len, rows)
                        })
                });
            }
        }
    }

    /// Like [`for_rows_mut`](Self::for_rows_mut) over two row-aligned buffers.
    ///
    /// Both buffers must hold the same number of rows; row `i` of `a` and row
    /// `i` of `b` always land in the same chunk.
    pub fn for_rows_mut_zip<A, B, F>(
        &self,
        a: &mut [A],
        a_row_len: usize,
        b: &mut [B],
        b_row_len: usize,
        f: F,
    ) where
        A: Send,
        B: Send,
        F: Fn(Range<usize>, &mut [A], &mut [B]) + Sync + Send,
    {
        debug_assert!(a_row_len > 0 && b_row_len > 0, "row lengths must be positive");
        debug_assert_eq!(
            a.len() / a_row_len,
            b.len() / b_row_len,
            "buffers must hold the same number of rows"
        );

        let total = a.len() / a_row_len;
        match &self.pool {
            None => f(0..total, a, b),
            Some(_) if total == 0 => {}
            Some(pool) => {
                let chunk = chunk_len(total, self.threads);
                pool.install(|| {
                    a.par_chunks_mut(chunk * a_row_len)
                        .zip(b.par_chunks_mut(chunk * b_row_len))
                        .enumerate()
                        .for_each(|(i, (rows_a, rows_b))| {
                            let lo = i * chunk;
                            f(lo..lo + rows_a.len() / a_row_len, rows_a, rows_b)
                        })
                });
            }
        }
    }
}

impl Default for ThreadLoop {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Run `f` over disjoint contiguous chunks of `[0, total)`.
///
/// With `threads == 0` the callback runs once on the full range in the
/// calling thread. Otherwise the range is split into at most `threads` chunks
/// which are processed on the global `rayon` pool; the call blocks until all
/// of them complete.
pub fn thread_loop<F>(total: usize, threads: usize, f: F)
where
    F: Fn(Range<usize>) + Sync + Send,
{
    if threads == 0 {
        f(0..total);
        return;
    }
    split_range(total, threads)
        .into_par_iter()
        .for_each(|range| f(range));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn split_range_covers_everything() {
        let ranges = split_range(10, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);

        let ranges = split_range(3, 8);
        assert_eq!(ranges, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn split_range_empty() {
        assert!(split_range(0, 4).is_empty());
    }

    #[test]
    fn sequential_runs_once_on_full_range() {
        let seen = Mutex::new(Vec::new());
        ThreadLoop::sequential().for_ranges(7, |range| seen.lock().unwrap().push(range));
        assert_eq!(*seen.lock().unwrap(), vec![0..7]);
    }

    #[test]
    fn thread_loop_visits_every_index_once() {
        let sum = AtomicUsize::new(0);
        let calls = AtomicUsize::new(0);
        thread_loop(100, 3, |range| {
            calls.fetch_add(1, Ordering::Relaxed);
            for i in range {
                sum.fetch_add(i, Ordering::Relaxed);
            }
        });
        assert_eq!(sum.load(Ordering::Relaxed), 4950);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn map_ranges_preserves_order() {
        let threads = ThreadLoop::new(4).unwrap();
        let firsts = threads.map_ranges(20, |range| range.start);
        assert_eq!(firsts, vec![0, 5, 10, 15]);
    }

    #[test]
    fn for_rows_mut_hands_out_matching_rows() {
        let threads = ThreadLoop::new(3).unwrap();
        let mut data = vec![0usize; 8 * 2];
        threads.for_rows_mut(&mut data, 2, |range, rows| {
            for (r, row) in range.zip(rows.chunks_mut(2)) {
                row[0] = r;
                row[1] = r * 10;
            }
        });
        for r in 0..8 {
            assert_eq!(data[2 * r], r);
            assert_eq!(data[2 * r + 1], r * 10);
        }
    }

    #[test]
    fn for_rows_mut_zip_keeps_rows_aligned() {
        let threads = ThreadLoop::new(2).unwrap();
        let mut a = vec![0usize; 5];
        let mut b = vec![0usize; 5 * 3];
        threads.for_rows_mut_zip(&mut a, 1, &mut b, 3, |range, ra, rb| {
            assert_eq!(ra.len() * 3, rb.len());
            for (i, s) in range.enumerate() {
                ra[i] = s;
                rb[3 * i..3 * i + 3].fill(s + 1);
            }
        });
        assert_eq!(a, vec![0, 1, 2, 3, 4]);
        assert_eq!(&b[12..15], &[5, 5, 5]);
    }
}
