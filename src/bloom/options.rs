//! The options bitfield, reified as a configuration record.

/// Round `bits` up to the next power of two and index by bitmask rather than modulo.
pub const NOROUND: u32 = 1;
/// `entries` passed to [`BloomFilter::init`](super::BloomFilter::init) is already a bit count.
pub const ENTS_IS_BITS: u32 = 2;
/// Always index with the full 64-bit hash words, even for sub-filters smaller than 2^32 bits.
pub const FORCE64: u32 = 4;
/// Never append a new sub-filter; let the active one absorb inserts past its `entries_target`.
pub const NO_SCALING: u32 = 8;

/// Per-filter configuration, expanded from the four-flag options bitfield.
///
/// The bitmask is kept as the serialization boundary (see [`BloomOptions::bits`] and
/// [`BloomOptions::from_bits`]) so a caller that only knows the four historical flag values can
/// still drive the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Deserialize, serde_crate::Serialize),
    serde(crate = "serde_crate")
)]
pub struct BloomOptions {
    /// Disable rounding `bits` up to a power of two.
    pub no_round: bool,
    /// Treat the caller-supplied `entries` as an already-computed bit count.
    pub entries_is_bits: bool,
    /// Force full 64-bit hash indexing regardless of sub-filter size.
    pub force_64bit: bool,
    /// Disable scaling: the active sub-filter absorbs every insert past its target.
    pub no_scaling: bool,
}

impl BloomOptions {
    /// The empty option set: rounding and scaling both on, neither `entries_is_bits` nor
    /// `force_64bit` set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Decodes a `BloomOptions` from the historical bitmask.
    ///
    /// # Examples
    /// ```
    /// use scaling_filters::bloom::{BloomOptions, options};
    ///
    /// let opts = BloomOptions::from_bits(options::FORCE64 | options::NO_SCALING);
    /// assert!(opts.force_64bit);
    /// assert!(opts.no_scaling);
    /// assert!(!opts.no_round);
    /// ```
    pub fn from_bits(bits: u32) -> Self {
        BloomOptions {
            no_round: bits & NOROUND != 0,
            entries_is_bits: bits & ENTS_IS_BITS != 0,
            force_64bit: bits & FORCE64 != 0,
            no_scaling: bits & NO_SCALING != 0,
        }
    }

    /// Encodes this `BloomOptions` back into the historical bitmask.
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.no_round {
            bits |= NOROUND;
        }
        if self.entries_is_bits {
            bits |= ENTS_IS_BITS;
        }
        if self.force_64bit {
            bits |= FORCE64;
        }
        if self.no_scaling {
            bits |= NO_SCALING;
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for bits in 0..16u32 {
            assert_eq!(BloomOptions::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn test_none() {
        assert_eq!(BloomOptions::none().bits(), 0);
    }
}
