//! Error types returned by the two filter engines.
//!
//! Both engines are in-process libraries with no internal logging: every failure is reported to
//! the caller through one of these types rather than being retried or swallowed.

use std::fmt;

/// Errors that can occur while constructing or growing a [`BloomFilter`](crate::bloom::BloomFilter).
#[derive(Debug, thiserror::Error)]
pub enum BloomError {
    /// `entries` was below the minimum the engine will size a sub-filter for.
    #[error("entries must be at least {min}, got {actual}")]
    EntriesTooSmall {
        /// The smallest accepted `entries` value.
        min: u64,
        /// The value that was actually supplied.
        actual: u64,
    },
    /// `error` was not a probability strictly between 0 and 1.
    #[error("error rate must lie in (0, 1), got {0}")]
    InvalidErrorRate(f64),
    /// The backing bit array could not be allocated.
    #[error("failed to allocate {bits} bits for the bloom filter's bit array")]
    AllocationFailed {
        /// The number of bits the allocation was sized for.
        bits: u64,
    },
}

/// Errors that can occur while constructing or growing a [`CuckooFilter`](crate::cuckoo::CuckooFilter).
#[derive(Debug, thiserror::Error)]
pub enum CuckooError {
    /// `capacity` was zero.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    /// `bucket_size` was zero.
    #[error("bucket_size must be greater than zero")]
    ZeroBucketSize,
    /// `expansion` was zero.
    #[error("expansion must be greater than zero")]
    ZeroExpansion,
    /// The backing bucket array could not be allocated.
    #[error("failed to allocate {buckets} buckets of {bucket_size} bytes each")]
    AllocationFailed {
        /// The number of buckets the allocation was sized for.
        buckets: u64,
        /// The configured bucket size, in fingerprint slots.
        bucket_size: usize,
    },
}

/// Outcome of a single [`CuckooFilter::insert`](crate::cuckoo::CuckooFilter::insert) or
/// [`CuckooFilter::insert_unique`](crate::cuckoo::CuckooFilter::insert_unique) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuckooInsertStatus {
    /// The fingerprint was placed in a bucket.
    Inserted,
    /// `insert_unique` found the fingerprint already present and did not insert a duplicate.
    Exists,
    /// Eviction exhausted its iteration budget in every sub-filter, including a freshly grown
    /// one, and the fingerprint was not placed.
    NoSpace,
    /// Growing a new sub-filter to make room failed because the allocation could not be made.
    MemAllocFailed,
}

impl fmt::Display for CuckooInsertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CuckooInsertStatus::Inserted => "inserted",
            CuckooInsertStatus::Exists => "exists",
            CuckooInsertStatus::NoSpace => "no space",
            CuckooInsertStatus::MemAllocFailed => "memory allocation failed",
        };
        f.write_str(s)
    }
}
