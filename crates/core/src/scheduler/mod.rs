//! Row-band fan-out for per-pixel work.
//!
//! The output image is cut into contiguous horizontal bands and each band is
//! processed as one task on a rayon pool. `run`/`run_rows` only return once
//! every band has finished.

use crate::Result;

/// Number of threads the machine can run in parallel, at least 1.
pub fn hardware_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Half-open range of rows `[start, end)` owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    pub start: usize,
    pub end: usize,
}

impl RowBand {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Splits `[0, height)` into `count` contiguous bands; the last band takes
    /// the remainder. `count` is raised to 1 and capped at `height` so no band
    /// is empty unless the image is.
    pub fn split(height: usize, count: usize) -> Vec<RowBand> {
        let count = count.max(1).min(height.max(1));
        let rows = height / count;
        (0..count)
            .map(|i| {
                let start = i * rows;
                let end = if i + 1 == count { height } else { start + rows };
                RowBand::new(start, end)
            })
            .collect()
    }
}

/// Bounded worker pool that executes row bands.
pub struct TileScheduler {
    pool: rayon::ThreadPool,
    max_bands: usize,
}

impl TileScheduler {
    /// Pool sized to the hardware parallelism.
    pub fn new() -> Result<Self> {
        Self::with_threads(hardware_parallelism())
    }

    /// Pool with `threads` workers, clamped to `[1, hardware_parallelism()]`.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let max_bands = hardware_parallelism();
        let threads = threads.clamp(1, max_bands);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("visfx-band-{index}"))
            .build()?;
        tracing::debug!(threads, max_bands, "tile scheduler ready");
        Ok(Self { pool, max_bands })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Clamps a requested band count to `[1, hardware_parallelism()]`.
    pub fn band_count(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_bands)
    }

    /// Calls `work` once per band of `[0, height)` and waits for all of them.
    pub fn run<F>(&self, height: usize, band_count: usize, work: F)
    where
        F: Fn(RowBand) + Sync,
    {
        let bands = RowBand::split(height, self.band_count(band_count));
        let work = &work;
        self.pool.scope(|scope| {
            for band in bands {
                scope.spawn(move |_| work(band));
            }
        });
    }

    /// Like [`run`](Self::run), but also hands each band exclusive access to
    /// its rows of `pixels` (row-major, `width` pixels per row).
    pub fn run_rows<F>(&self, pixels: &mut [u32], width: usize, band_count: usize, work: F)
    where
        F: Fn(RowBand, &mut [u32]) + Sync,
    {
        if width == 0 || pixels.is_empty() {
            return;
        }
        debug_assert_eq!(pixels.len() % width, 0, "pixel slice is not whole rows");
        let height = pixels.len() / width;
        let bands = RowBand::split(height, self.band_count(band_count));
        let work = &work;

        self.pool.scope(|scope| {
            let mut rest = pixels;
            for band in bands {
                let (rows, tail) = std::mem::take(&mut rest).split_at_mut(band.len() * width);
                rest = tail;
                scope.spawn(move |_| work(band, rows));
            }
        });
    }
}

impl std::fmt::Debug for TileScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileScheduler")
            .field("threads", &self.threads())
            .field("max_bands", &self.max_bands)
            .finish()
    }
}
