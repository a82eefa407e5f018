//! A scaling bloom filter: a space-efficient probabilistic data structure for approximate
//! membership queries in a set, with no false negatives and no deletion.

mod filter;
pub mod options;
mod sub_filter;

pub use self::filter::{BloomAddOutcome, BloomFilter, MIN_ENTRIES};
pub use self::options::BloomOptions;
