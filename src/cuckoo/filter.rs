//! A growable cuckoo filter: fingerprint-based approximate set membership supporting deletion.

use super::sub_filter::CuckooSubFilter;
use crate::error::{CuckooError, CuckooInsertStatus};
use crate::hash::{mix_fingerprint, DoubleHasher, HashPair};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::hash::Hash;

/// `(i1, i2, fp)` for a key, as populated by [`CuckooFilter::get_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuckooKey {
    /// The key's primary candidate bucket in the active sub-filter.
    pub i1: u64,
    /// The key's alternate candidate bucket in the active sub-filter.
    pub i2: u64,
    /// The key's one-byte fingerprint.
    pub fp: u8,
}

fn fingerprint_and_indices(hash: HashPair, mask: u64) -> (u8, u64, u64) {
    let raw_fingerprint = (hash.a & 0xFF) as u8;
    let fp = if raw_fingerprint == 0 { 1 } else { raw_fingerprint };
    let i1 = (hash.a >> 8) & mask;
    let i2 = i1 ^ (mix_fingerprint(fp) & mask);
    (fp, i1, i2)
}

/// A scaling cuckoo filter: an ordered, append-only sequence of [`CuckooSubFilter`]s. Inserting
/// into the active (last) sub-filter may evict and relocate existing fingerprints within it; if
/// eviction exhausts its iteration budget, a new, larger sub-filter is appended and the insert is
/// retried once there.
///
/// Unlike the bloom filter, a cuckoo filter supports deletion (modulo fingerprint collisions: two
/// keys that land on the same candidate buckets with the same fingerprint are indistinguishable).
///
/// # Examples
/// ```
/// use scaling_filters::cuckoo::CuckooFilter;
///
/// let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
/// assert!(!filter.check(&"alice"));
/// filter.insert(&"alice").unwrap();
/// assert!(filter.check(&"alice"));
/// assert!(filter.delete(&"alice"));
/// assert!(!filter.check(&"alice"));
/// ```
pub struct CuckooFilter {
    sub_filters: Vec<CuckooSubFilter>,
    bucket_size: usize,
    max_iterations: usize,
    expansion: u64,
    num_items: u64,
    num_deletes: u64,
    hasher: DoubleHasher,
    rng: XorShiftRng,
}

impl CuckooFilter {
    /// Initializes a new `CuckooFilter` sized for `capacity` items at `bucket_size` fingerprint
    /// slots per bucket. `max_iterations` bounds each insert's eviction loop; `expansion`
    /// multiplies `num_buckets` (rounded to a power of two) whenever a new sub-filter is
    /// appended.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::cuckoo::CuckooFilter;
    ///
    /// let filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
    /// assert_eq!(filter.filter_count(), 1);
    /// ```
    pub fn init(
        capacity: u64,
        bucket_size: usize,
        max_iterations: usize,
        expansion: u64,
    ) -> Result<Self, CuckooError> {
        if capacity == 0 {
            return Err(CuckooError::ZeroCapacity);
        }
        if bucket_size == 0 {
            return Err(CuckooError::ZeroBucketSize);
        }
        if expansion == 0 {
            return Err(CuckooError::ZeroExpansion);
        }

        let num_buckets = ((capacity + bucket_size as u64 - 1) / bucket_size as u64)
            .max(1)
            .next_power_of_two();
        let first = CuckooSubFilter::new(num_buckets, bucket_size)?;

        Ok(CuckooFilter {
            sub_filters: vec![first],
            bucket_size,
            max_iterations,
            expansion,
            num_items: 0,
            num_deletes: 0,
            hasher: DoubleHasher::new(),
            rng: XorShiftRng::from_entropy(),
        })
    }

    fn hash_item<T>(&self, item: &T) -> HashPair
    where
        T: Hash + ?Sized,
    {
        self.hasher.hash(item)
    }

    /// Checks whether `item` is possibly in the filter, testing every sub-filter.
    pub fn check<T>(&self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.check_hash(self.hash_item(item).a)
    }

    /// Checks a raw 64-bit key hash for membership.
    pub fn check_hash(&self, hash: u64) -> bool {
        self.sub_filters.iter().any(|sub| {
            let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, sub.mask());
            sub.contains(i1, fp) || sub.contains(i2, fp)
        })
    }

    /// Attempts to grow the relocation chain within the active sub-filter, returning `true` if
    /// `fingerprint` ends up placed somewhere.
    fn evict_into_active(&mut self, fingerprint: u8, i1: u64, i2: u64) -> bool {
        let active = self.sub_filters.last_mut().expect("at least one sub-filter");
        if active.try_insert(i1, fingerprint) || active.try_insert(i2, fingerprint) {
            return true;
        }

        let mask = active.mask();
        let mut fingerprint = fingerprint;
        let mut bucket = if self.rng.gen::<bool>() { i1 } else { i2 };

        for _ in 0..self.max_iterations {
            let active = self.sub_filters.last_mut().expect("at least one sub-filter");
            fingerprint = active.evict(bucket, fingerprint, &mut self.rng);
            bucket ^= mix_fingerprint(fingerprint) & mask;
            let active = self.sub_filters.last_mut().expect("at least one sub-filter");
            if active.try_insert(bucket, fingerprint) {
                return true;
            }
        }
        false
    }

    fn grow(&mut self) -> Result<(), CuckooError> {
        let last = self.sub_filters.last().expect("at least one sub-filter");
        let new_num_buckets =
            ((last.num_buckets() as f64 * self.expansion as f64).ceil() as u64).next_power_of_two();
        let new_sub = CuckooSubFilter::new(new_num_buckets, self.bucket_size)?;
        self.sub_filters.push(new_sub);
        Ok(())
    }

    fn insert_hash(&mut self, hash: u64, unique: bool) -> CuckooInsertStatus {
        let active_mask = self
            .sub_filters
            .last()
            .expect("at least one sub-filter")
            .mask();
        let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, active_mask);

        let active = self.sub_filters.last().expect("at least one sub-filter");
        if unique && (active.contains(i1, fp) || active.contains(i2, fp)) {
            return CuckooInsertStatus::Exists;
        }

        if self.evict_into_active(fp, i1, i2) {
            self.num_items += 1;
            return CuckooInsertStatus::Inserted;
        }

        match self.grow() {
            Ok(()) => {
                let new_mask = self
                    .sub_filters
                    .last()
                    .expect("at least one sub-filter")
                    .mask();
                let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, new_mask);
                if self.evict_into_active(fp, i1, i2) {
                    self.num_items += 1;
                    CuckooInsertStatus::Inserted
                } else {
                    CuckooInsertStatus::NoSpace
                }
            }
            Err(_) => CuckooInsertStatus::MemAllocFailed,
        }
    }

    /// Inserts `item`, always adding a second fingerprint occurrence if the bucket has room even
    /// when the fingerprint is already present.
    pub fn insert<T>(&mut self, item: &T) -> CuckooInsertStatus
    where
        T: Hash + ?Sized,
    {
        self.insert_hash(self.hash_item(item).a, false)
    }

    /// Inserts `item`, short-circuiting with [`CuckooInsertStatus::Exists`] if its fingerprint is
    /// already present in either candidate bucket of the active sub-filter.
    pub fn insert_unique<T>(&mut self, item: &T) -> CuckooInsertStatus
    where
        T: Hash + ?Sized,
    {
        self.insert_hash(self.hash_item(item).a, true)
    }

    /// Removes one occurrence of `item`, searching every sub-filter's candidate buckets. Returns
    /// whether a matching fingerprint was found and removed.
    pub fn delete<T>(&mut self, item: &T) -> bool
    where
        T: Hash + ?Sized,
    {
        self.delete_hash(self.hash_item(item).a)
    }

    /// Removes one occurrence of a raw 64-bit key hash.
    pub fn delete_hash(&mut self, hash: u64) -> bool {
        for sub in self.sub_filters.iter_mut() {
            let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, sub.mask());
            if sub.remove(i1, fp) || sub.remove(i2, fp) {
                self.num_items -= 1;
                self.num_deletes += 1;
                return true;
            }
        }
        false
    }

    /// Returns an upper-bound estimate of the number of times `item`'s fingerprint occupies its
    /// candidate buckets across every sub-filter. Overcounts when an unrelated key collides into
    /// the same buckets and fingerprint.
    pub fn count<T>(&self, item: &T) -> u64
    where
        T: Hash + ?Sized,
    {
        self.count_hash(self.hash_item(item).a)
    }

    /// Counts occurrences of a raw 64-bit key hash's fingerprint across every sub-filter.
    pub fn count_hash(&self, hash: u64) -> u64 {
        self.sub_filters
            .iter()
            .map(|sub| {
                let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, sub.mask());
                if i1 == i2 {
                    sub.count(i1, fp) as u64
                } else {
                    (sub.count(i1, fp) + sub.count(i2, fp)) as u64
                }
            })
            .sum()
    }

    /// Populates the candidate buckets and fingerprint a key would use in the active sub-filter.
    pub fn get_info<T>(&self, item: &T) -> CuckooKey
    where
        T: Hash + ?Sized,
    {
        let hash = self.hash_item(item).a;
        let mask = self
            .sub_filters
            .last()
            .expect("at least one sub-filter")
            .mask();
        let (fp, i1, i2) = fingerprint_and_indices(HashPair { a: hash, b: 0 }, mask);
        CuckooKey { i1, i2, fp }
    }

    /// Walks every sub-filter oldest-to-newest, relocating live fingerprints into the first
    /// earlier sub-filter (by index) whose corresponding candidate bucket has room. This never
    /// loses entries: a fingerprint either moves to an earlier sub-filter or stays put.
    ///
    /// When `cont` is `false`, compaction stops as soon as a sub-filter is found with no room to
    /// accept relocations from a later one. When `cont` is `true`, it continues through every
    /// sub-filter regardless. `num_deletes` is reset to zero once the whole filter has been
    /// walked.
    pub fn compact(&mut self, cont: bool) {
        let n = self.sub_filters.len();
        let mut observed_whole_filter = true;
        'outer: for src in 0..n {
            let num_buckets = self.sub_filters[src].num_buckets();
            let bucket_size = self.bucket_size;
            for bucket in 0..num_buckets {
                for slot in 0..bucket_size {
                    if !self.relocate_slot(src, bucket, slot) && !cont && src > 0 {
                        observed_whole_filter = false;
                        break 'outer;
                    }
                }
            }
        }
        if observed_whole_filter {
            self.num_deletes = 0;
        }
    }

    /// Attempts to relocate the fingerprint at `(bucket, slot)` of sub-filter `src` into the
    /// first earlier sub-filter whose matching candidate bucket has room. Returns `true` if
    /// either nothing needed moving (slot empty) or the move succeeded; `false` if a live
    /// fingerprint could not be relocated.
    fn relocate_slot(&mut self, src: usize, bucket: u64, slot: usize) -> bool {
        let fingerprint = self.sub_filters[src].peek(bucket, slot);
        if fingerprint == super::sub_filter::NULL_FINGERPRINT {
            return true;
        }
        for dst in 0..src {
            let dst_mask = self.sub_filters[dst].mask();
            let candidate_primary = bucket & dst_mask;
            let candidate_alt = candidate_primary ^ (mix_fingerprint(fingerprint) & dst_mask);
            for &candidate in &[candidate_primary, candidate_alt] {
                if self.sub_filters[dst].try_insert(candidate, fingerprint) {
                    self.sub_filters[src].clear_slot(bucket, slot);
                    return true;
                }
            }
        }
        false
    }

    /// Returns the number of sub-filters currently in the sequence.
    pub fn filter_count(&self) -> usize {
        self.sub_filters.len()
    }

    /// Returns the number of buckets in the `k`th sub-filter, if it exists.
    pub fn num_buckets(&self, k: usize) -> Option<u64> {
        self.sub_filters.get(k).map(CuckooSubFilter::num_buckets)
    }

    /// Returns the running count of live items across every sub-filter.
    pub fn num_items(&self) -> u64 {
        self.num_items
    }

    /// Returns the running count of deletions since the last compaction.
    pub fn num_deletes(&self) -> u64 {
        self.num_deletes
    }

    /// Returns the configured bucket size.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Returns the configured per-insert eviction iteration budget.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the configured expansion factor applied when appending a new sub-filter.
    pub fn expansion(&self) -> u64 {
        self.expansion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_check_delete() {
        let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
        for i in 0..999u32 {
            let key = format!("key{}", i);
            assert_eq!(filter.insert(&key), CuckooInsertStatus::Inserted);
        }
        for i in 0..999u32 {
            assert!(filter.check(&format!("key{}", i)));
        }

        for i in 0..500u32 {
            assert!(filter.delete(&format!("key{}", i)));
        }
        assert_eq!(filter.num_items(), 499);
        assert_eq!(filter.num_deletes(), 500);
    }

    #[test]
    fn test_insert_unique_short_circuits() {
        let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
        assert_eq!(filter.insert_unique(&"alice"), CuckooInsertStatus::Inserted);
        assert_eq!(filter.insert_unique(&"alice"), CuckooInsertStatus::Exists);
    }

    #[test]
    fn test_growth_on_overflow() {
        let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
        for i in 0..8192u32 {
            filter.insert(&format!("key{}", i));
        }
        assert!(filter.filter_count() >= 2);
        for k in 1..filter.filter_count() {
            let prev = filter.num_buckets(k - 1).unwrap();
            let cur = filter.num_buckets(k).unwrap();
            assert!(cur >= prev);
            assert!(cur.is_power_of_two());
        }
    }

    #[test]
    fn test_symmetric_candidate_property() {
        let mask = (1u64 << 10) - 1;
        for fp in 1u8..=255 {
            let i1 = 0x2AAu64 & mask;
            let i2 = i1 ^ (mix_fingerprint(fp) & mask);
            assert_eq!(i1, i2 ^ (mix_fingerprint(fp) & mask));
        }
    }

    #[test]
    fn test_zero_config_rejected() {
        assert!(CuckooFilter::init(0, 2, 20, 2).is_err());
        assert!(CuckooFilter::init(1024, 0, 20, 2).is_err());
        assert!(CuckooFilter::init(1024, 2, 20, 0).is_err());
    }

    #[test]
    fn test_compact_preserves_membership_and_count() {
        let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
        for i in 0..4096u32 {
            filter.insert(&format!("key{}", i));
        }
        for i in 0..2048u32 {
            filter.delete(&format!("key{}", i));
        }
        let filters_before = filter.filter_count();
        filter.compact(true);
        assert_eq!(filter.filter_count(), filters_before);
        for i in 2048..4096u32 {
            assert!(filter.check(&format!("key{}", i)));
        }
    }

    #[test]
    fn test_compact_non_continuous_does_not_reset_deletes_on_early_stop() {
        let mut filter = CuckooFilter::init(1024, 2, 20, 2).unwrap();
        // Grows to at least two sub-filters; the first sub-filter is full at the moment of
        // growth, so relocating into it during a non-continuous compact fails immediately.
        for i in 0..8192u32 {
            filter.insert(&format!("key{}", i));
        }
        assert!(filter.filter_count() >= 2);

        for i in 4096..4100u32 {
            assert!(filter.delete(&format!("key{}", i)));
        }
        assert_eq!(filter.num_deletes(), 4);

        let filters_before = filter.filter_count();
        filter.compact(false);
        assert_eq!(filter.filter_count(), filters_before);
        // The walk stopped short of the last sub-filter, so it never observed the whole filter
        // and must not reset the delete counter.
        assert_eq!(filter.num_deletes(), 4);
    }
}
