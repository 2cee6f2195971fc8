//! Tunables read by the optimizer and the thread pool manager.

/// Configuration consumed by the optimizer and pool manager.
///
/// Loading this from a file or environment is out of scope for this crate;
/// the embedding host is expected to construct a `Config` directly, either
/// with a preset or with field literals.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// When `true`, the storage engine maintains materialized transpose
    /// matrices, so the optimizer's transpose penalty is always zero.
    pub maintain_transpose: bool,
    /// Admission bound shared by the reader and writer pools. `None` means
    /// unlimited.
    pub max_queued_queries: Option<u64>,
    /// Width of the reader pool.
    pub reader_threads: usize,
    /// Width of the writer pool.
    pub writer_threads: usize,
    /// Width of the bulk-loader pool.
    pub bulk_loader_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maintain_transpose: false,
            max_queued_queries: None,
            reader_threads: 4,
            writer_threads: 1,
            bulk_loader_threads: 1,
        }
    }
}

impl Config {
    /// A configuration tuned for a production deployment: transpose
    /// matrices are maintained, admission control is bounded, and pools
    /// are sized for a multi-core host.
    pub fn production() -> Self {
        Self {
            maintain_transpose: true,
            max_queued_queries: Some(256),
            reader_threads: 16,
            writer_threads: 4,
            bulk_loader_threads: 2,
        }
    }

    /// A balanced configuration suitable for a single mid-size host.
    pub fn balanced() -> Self {
        Self {
            maintain_transpose: true,
            max_queued_queries: Some(64),
            reader_threads: 8,
            writer_threads: 2,
            bulk_loader_threads: 1,
        }
    }

    /// A configuration for benchmarking the optimizer's penalty path:
    /// transpose maintenance is disabled so the full scoring formula runs,
    /// and pools are single-threaded for reproducible timings.
    pub fn benchmark() -> Self {
        Self {
            maintain_transpose: false,
            max_queued_queries: None,
            reader_threads: 1,
            writer_threads: 1,
            bulk_loader_threads: 1,
        }
    }
}
