//! One level of a scaling bloom filter.

use super::options::BloomOptions;
use crate::bit_vec::BitVec;
use crate::error::BloomError;
use crate::hash::HashPair;

/// One generation of a [`BloomFilter`](super::BloomFilter). Sized once at construction and never
/// resized; a filter appends a new, larger, tighter `BloomSubFilter` instead of growing this one
/// in place.
#[derive(Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Deserialize, serde_crate::Serialize),
    serde(crate = "serde_crate")
)]
pub(crate) struct BloomSubFilter {
    entries_target: u64,
    error_rate: f64,
    bit_array: BitVec,
    hash_count: usize,
    force_64bit: bool,
    /// `log2(bits)` when `bits` was rounded to a power of two; `0` means index by modulo.
    n2: u32,
    inserted: u64,
}

impl BloomSubFilter {
    /// `bits_per_entry = -ln(error) / (ln 2)^2`, the classical bloom filter sizing formula.
    fn bits_per_entry(error_rate: f64) -> f64 {
        -error_rate.ln() / std::f64::consts::LN_2.powi(2)
    }

    fn hash_count_for(bits_per_entry: f64) -> usize {
        ((bits_per_entry * std::f64::consts::LN_2).round() as i64).max(1) as usize
    }

    fn allocate(bits: u64) -> Result<BitVec, BloomError> {
        BitVec::try_new(bits as usize).map_err(|_| BloomError::AllocationFailed { bits })
    }

    /// Sizes a sub-filter for `entries_target` expected insertions at `error_rate`.
    pub(crate) fn new(
        entries_target: u64,
        error_rate: f64,
        options: &BloomOptions,
    ) -> Result<Self, BloomError> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(BloomError::InvalidErrorRate(error_rate));
        }

        let bits_per_entry = Self::bits_per_entry(error_rate);
        let (raw_bits, hash_count) = if options.entries_is_bits {
            (entries_target, Self::hash_count_for(bits_per_entry))
        } else {
            let bits = (entries_target as f64 * bits_per_entry).ceil() as u64;
            (bits, Self::hash_count_for(bits_per_entry))
        };
        let raw_bits = raw_bits.max(1);

        let (bits, n2) = if !options.no_round && raw_bits.next_power_of_two() != 0 {
            let rounded = raw_bits.next_power_of_two();
            (rounded, rounded.trailing_zeros())
        } else {
            (raw_bits, 0)
        };

        let force_64bit = options.force_64bit || bits >= (1u64 << 32);
        let bit_array = Self::allocate(bits)?;

        Ok(BloomSubFilter {
            entries_target,
            error_rate,
            bit_array,
            hash_count,
            force_64bit,
            n2,
            inserted: 0,
        })
    }

    /// Sizes a sub-filter directly from an explicit bit count and hash count, used when
    /// `entries_is_bits` leaves the caller to supply both.
    pub(crate) fn from_bits(
        bits: u64,
        hash_count: usize,
        entries_target: u64,
        error_rate: f64,
        options: &BloomOptions,
    ) -> Result<Self, BloomError> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(BloomError::InvalidErrorRate(error_rate));
        }

        let (bits, n2) = if !options.no_round {
            let rounded = bits.max(1).next_power_of_two();
            (rounded, rounded.trailing_zeros())
        } else {
            (bits.max(1), 0)
        };
        let force_64bit = options.force_64bit || bits >= (1u64 << 32);
        let bit_array = Self::allocate(bits)?;

        Ok(BloomSubFilter {
            entries_target,
            error_rate,
            bit_array,
            hash_count: hash_count.max(1),
            force_64bit,
            n2,
            inserted: 0,
        })
    }

    fn bits(&self) -> u64 {
        self.bit_array.len() as u64
    }

    fn index_for(&self, hash: HashPair, probe: u64) -> u64 {
        let (mut a, mut b) = (hash.a, hash.b);
        if !self.force_64bit && self.bits() < (1u64 << 32) {
            a &= 0xFFFF_FFFF;
            b &= 0xFFFF_FFFF;
        }
        let raw = a.wrapping_add(probe.wrapping_mul(b));
        if self.n2 > 0 {
            raw & (self.bits() - 1)
        } else {
            raw % self.bits()
        }
    }

    /// Returns `true` iff every one of `hash_count` indexed bits is set.
    pub(crate) fn check(&self, hash: HashPair) -> bool {
        (0..self.hash_count as u64).all(|probe| {
            self.bit_array
                .get(self.index_for(hash, probe) as usize)
                .unwrap_or(false)
        })
    }

    /// Sets every indexed bit. Returns `true` if at least one bit was not already set (a newly
    /// recorded key); `false` if the key's bit pattern was already fully set.
    pub(crate) fn add(&mut self, hash: HashPair) -> bool {
        let already_present = self.check(hash);
        for probe in 0..self.hash_count as u64 {
            let index = self.index_for(hash, probe) as usize;
            self.bit_array.set(index, true);
        }
        if !already_present {
            self.inserted += 1;
        }
        !already_present
    }

    pub(crate) fn entries_target(&self) -> u64 {
        self.entries_target
    }

    pub(crate) fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub(crate) fn is_full(&self) -> bool {
        self.inserted >= self.entries_target
    }

    pub(crate) fn len_bits(&self) -> u64 {
        self.bits()
    }

    pub(crate) fn count_ones(&self) -> usize {
        self.bit_array.count_ones()
    }

    pub(crate) fn count_zeros(&self) -> usize {
        self.bit_array.count_zeros()
    }

    pub(crate) fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// Estimated false-positive probability given how many bits are currently set, following
    /// the standard `(1 - e^{-kn/m})^k` approximation.
    pub(crate) fn estimate_fpp(&self) -> f64 {
        let ones = self.count_ones() as f64;
        let bits = self.bits() as f64;
        (ones / bits).powi(self.hash_count as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DoubleHasher;

    fn hash_for(hasher: &DoubleHasher, item: &str) -> HashPair {
        hasher.hash(&item)
    }

    #[test]
    fn test_sizing_matches_formula() {
        let options = BloomOptions::none();
        let sub = BloomSubFilter::new(1000, 0.01, &options).unwrap();
        // bits_per_entry = -ln(0.01) / ln(2)^2 ~= 9.585, so bits ~= 9585, rounded to 16384.
        assert_eq!(sub.len_bits(), 16384);
        assert_eq!(sub.hash_count(), 7);
    }

    #[test]
    fn test_no_round_uses_modulo_indexing() {
        let mut options = BloomOptions::none();
        options.no_round = true;
        let sub = BloomSubFilter::new(1000, 0.01, &options).unwrap();
        assert_eq!(sub.n2, 0);
        // bits_per_entry ~= 9.585 -> ceil(9585) = 9585 exactly.
        assert_eq!(sub.len_bits(), 9585);
    }

    #[test]
    fn test_invalid_error_rate_rejected() {
        let options = BloomOptions::none();
        assert!(BloomSubFilter::new(1000, 0.0, &options).is_err());
        assert!(BloomSubFilter::new(1000, 1.0, &options).is_err());
        assert!(BloomSubFilter::new(1000, -0.5, &options).is_err());
    }

    #[test]
    fn test_add_and_check() {
        let options = BloomOptions::none();
        let mut sub = BloomSubFilter::new(1000, 0.01, &options).unwrap();
        let hasher = DoubleHasher::new();

        let alice = hash_for(&hasher, "alice");
        assert!(!sub.check(alice));
        assert!(sub.add(alice));
        assert!(sub.check(alice));
        // Re-adding a key already fully set reports no new bits.
        assert!(!sub.add(alice));
    }

    #[test]
    fn test_force_64bit_flag() {
        let mut options = BloomOptions::none();
        options.force_64bit = true;
        let sub = BloomSubFilter::new(1000, 0.01, &options).unwrap();
        assert!(sub.force_64bit);
    }
}
