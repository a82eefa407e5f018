//! One level of a scaling cuckoo filter: a rectangular array of buckets, each holding
//! `bucket_size` one-byte fingerprints.

use crate::error::CuckooError;

/// The reserved fingerprint value meaning "empty slot". A zero hash-derived fingerprint is
/// remapped to 1 so it is never confused with an empty slot.
pub(crate) const NULL_FINGERPRINT: u8 = 0;

/// One generation of a [`CuckooFilter`](super::CuckooFilter): `num_buckets` buckets of
/// `bucket_size` fingerprint slots each, stored as a flat byte buffer with
/// `data[bucket * bucket_size + slot]` indexing in place of the reference's
/// `CuckooBucket[1]` flexible-array-member idiom.
pub(crate) struct CuckooSubFilter {
    num_buckets: u64,
    bucket_size: usize,
    data: Vec<u8>,
}

impl CuckooSubFilter {
    pub(crate) fn new(num_buckets: u64, bucket_size: usize) -> Result<Self, CuckooError> {
        debug_assert!(num_buckets.is_power_of_two());
        let len = num_buckets as usize * bucket_size;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| CuckooError::AllocationFailed {
            buckets: num_buckets,
            bucket_size,
        })?;
        data.resize(len, NULL_FINGERPRINT);
        Ok(CuckooSubFilter {
            num_buckets,
            bucket_size,
            data,
        })
    }

    pub(crate) fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    pub(crate) fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// `num_buckets` is always a power of two, so indices are masked rather than taken modulo.
    pub(crate) fn mask(&self) -> u64 {
        self.num_buckets - 1
    }

    fn offset(&self, bucket: u64, slot: usize) -> usize {
        bucket as usize * self.bucket_size + slot
    }

    fn slot(&self, bucket: u64, slot: usize) -> u8 {
        self.data[self.offset(bucket, slot)]
    }

    fn set_slot(&mut self, bucket: u64, slot: usize, fingerprint: u8) {
        let offset = self.offset(bucket, slot);
        self.data[offset] = fingerprint;
    }

    pub(crate) fn contains(&self, bucket: u64, fingerprint: u8) -> bool {
        (0..self.bucket_size).any(|slot| self.slot(bucket, slot) == fingerprint)
    }

    pub(crate) fn count(&self, bucket: u64, fingerprint: u8) -> usize {
        (0..self.bucket_size)
            .filter(|&slot| self.slot(bucket, slot) == fingerprint)
            .count()
    }

    /// Places `fingerprint` in the first empty slot of `bucket`, if any.
    pub(crate) fn try_insert(&mut self, bucket: u64, fingerprint: u8) -> bool {
        for slot in 0..self.bucket_size {
            if self.slot(bucket, slot) == NULL_FINGERPRINT {
                self.set_slot(bucket, slot, fingerprint);
                return true;
            }
        }
        false
    }

    /// Zeroes the first slot of `bucket` holding `fingerprint`, if any.
    pub(crate) fn remove(&mut self, bucket: u64, fingerprint: u8) -> bool {
        for slot in 0..self.bucket_size {
            if self.slot(bucket, slot) == fingerprint {
                self.set_slot(bucket, slot, NULL_FINGERPRINT);
                return true;
            }
        }
        false
    }

    /// Evicts the fingerprint at a random slot of `bucket`, replacing it with `fingerprint`, and
    /// returns the evicted value.
    pub(crate) fn evict(
        &mut self,
        bucket: u64,
        fingerprint: u8,
        rng: &mut impl rand::Rng,
    ) -> u8 {
        let slot = rng.gen_range(0, self.bucket_size);
        let victim = self.slot(bucket, slot);
        self.set_slot(bucket, slot, fingerprint);
        victim
    }

    /// Reads the raw fingerprint at `(bucket, slot)` without any search, used by compaction.
    pub(crate) fn peek(&self, bucket: u64, slot: usize) -> u8 {
        self.slot(bucket, slot)
    }

    /// Zeroes `(bucket, slot)` unconditionally, used by compaction once a fingerprint has been
    /// relocated elsewhere.
    pub(crate) fn clear_slot(&mut self, bucket: u64, slot: usize) {
        self.set_slot(bucket, slot, NULL_FINGERPRINT);
    }

    pub(crate) fn occupied_count(&self) -> u64 {
        self.data.iter().filter(|&&b| b != NULL_FINGERPRINT).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn test_try_insert_and_contains() {
        let mut sub = CuckooSubFilter::new(8, 2).unwrap();
        assert!(!sub.contains(3, 5));
        assert!(sub.try_insert(3, 5));
        assert!(sub.contains(3, 5));
        assert!(sub.try_insert(3, 6));
        // Bucket 3 now full.
        assert!(!sub.try_insert(3, 7));
    }

    #[test]
    fn test_remove() {
        let mut sub = CuckooSubFilter::new(8, 2).unwrap();
        sub.try_insert(1, 9);
        assert!(sub.remove(1, 9));
        assert!(!sub.contains(1, 9));
        assert!(!sub.remove(1, 9));
    }

    #[test]
    fn test_count() {
        let mut sub = CuckooSubFilter::new(4, 4).unwrap();
        sub.try_insert(0, 3);
        sub.try_insert(0, 3);
        sub.try_insert(0, 5);
        assert_eq!(sub.count(0, 3), 2);
        assert_eq!(sub.count(0, 5), 1);
        assert_eq!(sub.count(0, 9), 0);
    }

    #[test]
    fn test_evict_replaces_and_returns_victim() {
        let mut sub = CuckooSubFilter::new(4, 1).unwrap();
        sub.try_insert(0, 42);
        let mut rng = XorShiftRng::from_entropy();
        let victim = sub.evict(0, 99, &mut rng);
        assert_eq!(victim, 42);
        assert!(sub.contains(0, 99));
    }
}
