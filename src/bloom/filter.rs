//! A growable, space-efficient probabilistic data structure to test for membership in a set.

use super::options::BloomOptions;
use super::sub_filter::BloomSubFilter;
use crate::error::BloomError;
use crate::hash::{self, DoubleHasher, HashPair};
use std::hash::Hash;

/// The smallest `entries` value accepted by [`BloomFilter::init`] when `entries_is_bits` is not
/// set. Sizing formulas below this point produce sub-filters too small to meaningfully tighten
/// across scale-ups.
pub const MIN_ENTRIES: u64 = 1000;

/// The outcome of an `add` / `add_hash` call, carrying both the historical 0/1 result and the
/// soft over-capacity signal described for `NO_SCALING` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomAddOutcome {
    /// The key was not already present; its bits were newly set.
    Inserted,
    /// The key's bit pattern was already fully set.
    AlreadyPresent,
    /// The key was newly inserted into a sub-filter that has now exceeded its `entries_target`
    /// with scaling disabled; the effective false-positive bound for this sub-filter no longer
    /// holds.
    InsertedOverCapacity,
}

impl BloomAddOutcome {
    /// The historical 0/1 encoding: `0` for a newly inserted key, `1` if it was already present.
    /// `InsertedOverCapacity` still reports `0` since the key was in fact newly inserted.
    pub fn as_status(&self) -> i32 {
        match self {
            BloomAddOutcome::Inserted | BloomAddOutcome::InsertedOverCapacity => 0,
            BloomAddOutcome::AlreadyPresent => 1,
        }
    }
}

/// A scaling bloom filter: an ordered, append-only sequence of [`BloomSubFilter`]s that grows as
/// more items are inserted, tightening each new sub-filter's error rate so the compounded
/// false-positive probability across the whole sequence stays bounded by the filter's original
/// `error`.
///
/// Only the last (active) sub-filter ever receives inserts; earlier sub-filters are frozen and
/// only ever checked. A key is considered present if any sub-filter reports it present.
///
/// # Examples
/// ```
/// use scaling_filters::bloom::{BloomFilter, BloomOptions};
///
/// let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
///
/// assert!(!filter.check(&"alice"));
/// filter.add(&"alice");
/// assert!(filter.check(&"alice"));
/// ```
pub struct BloomFilter {
    sub_filters: Vec<BloomSubFilter>,
    options: BloomOptions,
    hasher: DoubleHasher,
}

impl BloomFilter {
    /// Initializes a new `BloomFilter` for an expected `entries` insertions at false-positive
    /// probability `error`.
    ///
    /// Returns [`BloomError::EntriesTooSmall`] if `entries < 1000` (unless `options.entries_is_bits`
    /// is set, in which case `entries` is a bit count and any positive value is accepted), and
    /// [`BloomError::InvalidErrorRate`] if `error` is not strictly between 0 and 1.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::bloom::{BloomFilter, BloomOptions};
    ///
    /// let filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
    /// assert_eq!(filter.sub_filter_count(), 1);
    /// ```
    pub fn init(entries: u64, error: f64, options: BloomOptions) -> Result<Self, BloomError> {
        if !options.entries_is_bits && entries < MIN_ENTRIES {
            return Err(BloomError::EntriesTooSmall {
                min: MIN_ENTRIES,
                actual: entries,
            });
        }
        let first = BloomSubFilter::new(entries, error, &options)?;
        Ok(BloomFilter {
            sub_filters: vec![first],
            options,
            hasher: DoubleHasher::new(),
        })
    }

    /// Initializes a new `BloomFilter` with an explicit `hash_count`, for the
    /// `entries_is_bits` case where sizing skips the `bits_per_entry` formula entirely and the
    /// caller supplies both the bit count and the number of hash probes directly rather than
    /// letting them be derived from `error`.
    ///
    /// `options.entries_is_bits` is forced on regardless of the passed-in `options`, since
    /// `bits` is always an explicit bit count here.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::bloom::{BloomFilter, BloomOptions};
    ///
    /// let filter = BloomFilter::init_with_hash_count(16384, 7, 0.01, BloomOptions::none()).unwrap();
    /// assert_eq!(filter.sub_filter_count(), 1);
    /// ```
    pub fn init_with_hash_count(
        bits: u64,
        hash_count: usize,
        error: f64,
        mut options: BloomOptions,
    ) -> Result<Self, BloomError> {
        options.entries_is_bits = true;
        let first = BloomSubFilter::from_bits(bits, hash_count, bits, error, &options)?;
        Ok(BloomFilter {
            sub_filters: vec![first],
            options,
            hasher: DoubleHasher::new(),
        })
    }

    /// Hashes a raw byte buffer the same way the filter would hash a key internally. Exposed so
    /// a caller can precompute a `HashPair` once and reuse it with [`check_hash`](Self::check_hash)
    /// and [`add_hash`](Self::add_hash).
    pub fn calc_hash(buffer: &[u8]) -> HashPair {
        hash::calc_hash(buffer)
    }

    fn hash_item<U>(&self, item: &U) -> HashPair
    where
        U: Hash + ?Sized,
    {
        self.hasher.hash(item)
    }

    /// Checks a precomputed `HashPair` for membership, testing every sub-filter in order.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::bloom::{BloomFilter, BloomOptions};
    ///
    /// let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
    /// let hash = BloomFilter::calc_hash(b"alice");
    /// assert!(!filter.check_hash(hash));
    /// filter.add_hash(hash).unwrap();
    /// assert!(filter.check_hash(hash));
    /// ```
    pub fn check_hash(&self, hash: HashPair) -> bool {
        self.sub_filters.iter().any(|sub| sub.check(hash))
    }

    /// Checks whether `item` is possibly in the filter.
    pub fn check<T>(&self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.check_hash(self.hash_item(item))
    }

    fn grow_if_needed(&mut self) -> Result<(), BloomError> {
        let active = self
            .sub_filters
            .last()
            .expect("a BloomFilter always has at least one sub-filter");
        if !self.options.no_scaling && active.is_full() {
            let new_entries_target = active.entries_target() * 2;
            let new_error_rate = active.error_rate() * 0.5;
            let new_sub = BloomSubFilter::new(new_entries_target, new_error_rate, &self.options)?;
            self.sub_filters.push(new_sub);
        }
        Ok(())
    }

    /// Adds a precomputed `HashPair` to the filter, growing the sequence with a new, larger,
    /// tighter sub-filter first if the active one has reached its `entries_target` and scaling is
    /// enabled.
    pub fn add_hash(&mut self, hash: HashPair) -> Result<BloomAddOutcome, BloomError> {
        if self.check_hash(hash) {
            return Ok(BloomAddOutcome::AlreadyPresent);
        }
        self.grow_if_needed()?;

        let over_capacity = self.options.no_scaling
            && self
                .sub_filters
                .last()
                .expect("a BloomFilter always has at least one sub-filter")
                .is_full();

        let active = self
            .sub_filters
            .last_mut()
            .expect("a BloomFilter always has at least one sub-filter");
        let newly_inserted = active.add(hash);
        debug_assert!(newly_inserted, "checked not-present above");

        if over_capacity {
            Ok(BloomAddOutcome::InsertedOverCapacity)
        } else {
            Ok(BloomAddOutcome::Inserted)
        }
    }

    /// Adds `item` to the filter.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::bloom::{BloomAddOutcome, BloomFilter, BloomOptions};
    ///
    /// let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
    /// assert_eq!(filter.add(&"alice").unwrap(), BloomAddOutcome::Inserted);
    /// assert_eq!(filter.add(&"alice").unwrap(), BloomAddOutcome::AlreadyPresent);
    /// ```
    pub fn add<T>(&mut self, item: &T) -> Result<BloomAddOutcome, BloomError>
    where
        T: Hash + ?Sized,
    {
        self.add_hash(self.hash_item(item))
    }

    /// Returns the number of sub-filters currently in the sequence.
    pub fn sub_filter_count(&self) -> usize {
        self.sub_filters.len()
    }

    /// Returns the total number of bits across every sub-filter.
    pub fn len(&self) -> u64 {
        self.sub_filters.iter().map(BloomSubFilter::len_bits).sum()
    }

    /// Returns `true` if the filter holds no bits (impossible in practice; a `BloomFilter` always
    /// sizes at least one sub-filter on construction).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of set bits across every sub-filter.
    pub fn count_ones(&self) -> usize {
        self.sub_filters.iter().map(BloomSubFilter::count_ones).sum()
    }

    /// Returns the number of unset bits across every sub-filter.
    pub fn count_zeros(&self) -> usize {
        self.sub_filters
            .iter()
            .map(BloomSubFilter::count_zeros)
            .sum()
    }

    /// Returns the estimated compounded false-positive probability across every sub-filter.
    pub fn estimate_fpp(&self) -> f64 {
        1.0 - self
            .sub_filters
            .iter()
            .map(|sub| 1.0 - sub.estimate_fpp())
            .product::<f64>()
    }

    /// Returns the crate version, mirroring the engines' `version()` entry point.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();

        assert!(!filter.check("alice"));
        filter.add("alice").unwrap();
        filter.add("bob").unwrap();
        filter.add("carol").unwrap();

        assert!(filter.check("alice"));
        assert!(filter.check("bob"));
        assert!(filter.check("carol"));

        assert_eq!(
            filter.add("alice").unwrap(),
            BloomAddOutcome::AlreadyPresent
        );
        assert_eq!(
            filter.add("eve").unwrap(),
            BloomAddOutcome::Inserted
        );
    }

    #[test]
    fn test_entries_too_small() {
        assert!(BloomFilter::init(10, 0.01, BloomOptions::none()).is_err());
    }

    #[test]
    fn test_init_with_hash_count_uses_caller_supplied_values() {
        let mut filter =
            BloomFilter::init_with_hash_count(16384, 7, 0.01, BloomOptions::none()).unwrap();
        assert_eq!(filter.len(), 16384);
        assert!(!filter.check("alice"));
        filter.add("alice").unwrap();
        assert!(filter.check("alice"));
    }

    #[test]
    fn test_init_with_hash_count_rejects_invalid_error_rate() {
        assert!(BloomFilter::init_with_hash_count(16384, 7, 0.0, BloomOptions::none()).is_err());
        assert!(BloomFilter::init_with_hash_count(16384, 7, 1.0, BloomOptions::none()).is_err());
    }

    #[test]
    fn test_scaling_grows_sub_filters() {
        let mut filter = BloomFilter::init(1000, 0.001, BloomOptions::none()).unwrap();
        for i in 0..2500 {
            filter.add(&format!("k{}", i)).unwrap();
        }
        assert!(filter.sub_filter_count() >= 2);
        for i in 0..2500 {
            assert!(filter.check(&format!("k{}", i)));
        }
    }

    #[test]
    fn test_no_scaling_stays_single_sub_filter() {
        let mut options = BloomOptions::none();
        options.no_scaling = true;
        let mut filter = BloomFilter::init(1000, 0.01, options).unwrap();
        let mut saw_over_capacity = false;
        for i in 0..5000 {
            let outcome = filter.add(&format!("k{}", i)).unwrap();
            if outcome == BloomAddOutcome::InsertedOverCapacity {
                saw_over_capacity = true;
            }
        }
        assert_eq!(filter.sub_filter_count(), 1);
        // Past `entries_target` with scaling disabled, later inserts are flagged over capacity
        // per spec.md §8 scenario 3 ("last inserts may report over-capacity").
        assert!(saw_over_capacity);
        assert_eq!(
            filter.add(&"well-past-capacity").unwrap(),
            BloomAddOutcome::InsertedOverCapacity
        );
    }

    #[test]
    fn test_hash_api_matches_item_api() {
        let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
        let hash = BloomFilter::calc_hash(b"alice");
        assert!(!filter.check_hash(hash));
        filter.add_hash(hash).unwrap();
        assert!(filter.check_hash(hash));
    }

    #[test]
    fn test_observed_false_positive_rate_within_bound() {
        let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
        for i in 0..1000 {
            filter.add(&format!("present-{}", i)).unwrap();
        }
        let mut false_positives = 0;
        for i in 0..10_000 {
            if filter.check(&format!("absent-{}", i)) {
                false_positives += 1;
            }
        }
        assert!((false_positives as f64 / 10_000.0) <= 0.02);
    }
}
