//! The hashing scheme shared by both filter engines.
//!
//! Each engine needs a pair of independent 64-bit words per key: one to seed a primary index and
//! one to fold into additional probes (bloom) or to derive a fingerprint and an alternate bucket
//! (cuckoo). `HashPair` is that pair; `DoubleHasher` is the oracle that produces it from two
//! keyed `SipHasher` instances, the same construction the scalable filters below already used for
//! their own two-hash simulation of `k` hash functions.

use siphasher::sip::SipHasher13;
use std::hash::{BuildHasher, Hash, Hasher as StdHasher};

/// The two 64-bit words produced by the shared hasher for a single key.
///
/// `a` selects the primary index; `b` is folded in per probe for the bloom filter and combined
/// with the fingerprint to derive the cuckoo filter's alternate bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Deserialize, serde_crate::Serialize),
    serde(crate = "serde_crate")
)]
pub struct HashPair {
    /// The first 64-bit word.
    pub a: u64,
    /// The second 64-bit word.
    pub b: u64,
}

/// Builds the keyed `SipHasher13` pair behind a [`DoubleHasher`].
///
/// # Examples
/// ```
/// use scaling_filters::hash::SipHasherBuilder;
/// use std::hash::BuildHasher;
///
/// let hash_builder = SipHasherBuilder::from_keys(0, 0);
/// let hasher = hash_builder.build_hasher();
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Deserialize, serde_crate::Serialize),
    serde(crate = "serde_crate")
)]
pub struct SipHasherBuilder {
    k0: u64,
    k1: u64,
}

impl SipHasherBuilder {
    /// Constructs a new `SipHasherBuilder` from a pair of keys.
    pub fn from_keys(k0: u64, k1: u64) -> Self {
        SipHasherBuilder { k0, k1 }
    }

    /// Constructs a new `SipHasherBuilder` seeded from entropy, matching the engines' construction
    /// of their default hashers.
    pub fn seeded() -> Self {
        use rand::RngCore;
        use rand_xorshift::XorShiftRng;
        use rand::SeedableRng;
        let mut rng = XorShiftRng::from_entropy();
        SipHasherBuilder {
            k0: rng.next_u64(),
            k1: rng.next_u64(),
        }
    }
}

impl BuildHasher for SipHasherBuilder {
    type Hasher = SipHasher13;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher13::new_with_keys(self.k0, self.k1)
    }
}

/// The shared hashing oracle: given a key, produces a [`HashPair`] of independent 64-bit words.
///
/// Opaque and non-cryptographic by contract; only determinism and avalanche quality matter to
/// the filters built on top of it.
///
/// # Examples
/// ```
/// use scaling_filters::hash::DoubleHasher;
///
/// let hasher = DoubleHasher::new();
/// let pair = hasher.hash(&"alice");
/// assert_eq!(pair, hasher.hash(&"alice"));
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Deserialize, serde_crate::Serialize),
    serde(crate = "serde_crate")
)]
pub struct DoubleHasher<B = SipHasherBuilder> {
    hash_builders: [B; 2],
}

impl DoubleHasher<SipHasherBuilder> {
    /// Constructs a new `DoubleHasher` with freshly seeded `SipHasher13` builders.
    pub fn new() -> Self {
        DoubleHasher {
            hash_builders: [SipHasherBuilder::seeded(), SipHasherBuilder::seeded()],
        }
    }
}

impl Default for DoubleHasher<SipHasherBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> DoubleHasher<B>
where
    B: BuildHasher,
{
    /// Constructs a new `DoubleHasher` from a pair of hasher builders.
    pub fn with_hashers(hash_builders: [B; 2]) -> Self {
        DoubleHasher { hash_builders }
    }

    /// Hashes `item`, returning the two independent 64-bit words produced by the underlying
    /// hasher pair.
    pub fn hash<T>(&self, item: &T) -> HashPair
    where
        T: Hash + ?Sized,
    {
        let mut words = [0u64; 2];
        for (word, hash_builder) in words.iter_mut().zip(self.hash_builders.iter()) {
            let mut hasher = hash_builder.build_hasher();
            item.hash(&mut hasher);
            *word = hasher.finish();
        }
        HashPair {
            a: words[0],
            b: words[1],
        }
    }

    /// Returns a reference to the underlying hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        &self.hash_builders
    }
}

/// Hashes a raw byte buffer into a [`HashPair`], mirroring the byte-buffer hashing entry point
/// exposed at the engines' external boundary (`calc_hash(buffer, len)`).
///
/// Unlike [`DoubleHasher::hash`], this does not depend on per-filter hasher keys: it is meant for
/// callers who already have an opaque key buffer and want the same pair of words the filter would
/// derive internally, using a fixed pair of keys (0 and 1) so the result is reproducible across
/// calls and processes.
///
/// # Examples
/// ```
/// use scaling_filters::hash::calc_hash;
///
/// let pair = calc_hash(b"alice");
/// assert_eq!(pair, calc_hash(b"alice"));
/// ```
pub fn calc_hash(buffer: &[u8]) -> HashPair {
    let hash_builders = [
        SipHasherBuilder::from_keys(0, 0),
        SipHasherBuilder::from_keys(1, 1),
    ];
    let mut words = [0u64; 2];
    for (word, hash_builder) in words.iter_mut().zip(hash_builders.iter()) {
        let mut hasher = hash_builder.build_hasher();
        hasher.write(buffer);
        *word = hasher.finish();
    }
    HashPair {
        a: words[0],
        b: words[1],
    }
}

/// A fixed odd 64-bit multiplier used to derive a cuckoo fingerprint's contribution to its
/// alternate bucket index. Multiplication by an odd constant is its own kind of avalanche and,
/// crucially, is injective mod 2^64, so `mix` never collapses distinct fingerprints together
/// before the result is masked down to the active sub-filter's bucket-index width.
const FINGERPRINT_MIX_CONSTANT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Mixes a cuckoo fingerprint into a bucket-index-sized perturbation.
///
/// `i2 = i1 ^ (mix(fp) & mask)` and, since XOR is its own inverse, `i1 = i2 ^ (mix(fp) & mask)`:
/// the symmetric candidate-bucket property holds for any mask as long as both sides use the same
/// mask.
///
/// # Examples
/// ```
/// use scaling_filters::hash::mix_fingerprint;
///
/// let mask = 0xFF;
/// let i1 = 0x42u64;
/// let i2 = i1 ^ (mix_fingerprint(7) & mask);
/// assert_eq!(i1, i2 ^ (mix_fingerprint(7) & mask));
/// ```
pub fn mix_fingerprint(fingerprint: u8) -> u64 {
    (fingerprint as u64).wrapping_mul(FINGERPRINT_MIX_CONSTANT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pair_deterministic() {
        let hasher = DoubleHasher::with_hashers([
            SipHasherBuilder::from_keys(0, 0),
            SipHasherBuilder::from_keys(1, 1),
        ]);
        assert_eq!(hasher.hash(&"alice"), hasher.hash(&"alice"));
        assert_ne!(hasher.hash(&"alice"), hasher.hash(&"bob"));
    }

    #[test]
    fn test_calc_hash_matches_buffer() {
        assert_eq!(calc_hash(b"alice"), calc_hash(b"alice"));
        assert_ne!(calc_hash(b"alice"), calc_hash(b"bob"));
    }

    #[test]
    fn test_mix_fingerprint_symmetric() {
        let mask = (1u64 << 20) - 1;
        for fp in 1u8..=255 {
            let i1 = 0x1234u64 & mask;
            let i2 = i1 ^ (mix_fingerprint(fp) & mask);
            assert_eq!(i1, i2 ^ (mix_fingerprint(fp) & mask));
        }
    }

    #[test]
    fn test_mix_fingerprint_never_zero_for_nonzero_input() {
        // Not an engine invariant by itself, but useful for catching a degenerate constant.
        assert_ne!(mix_fingerprint(1), 0);
    }
}
