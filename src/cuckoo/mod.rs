//! A scaling cuckoo filter: a space-efficient probabilistic data structure for approximate
//! membership queries in a set, with support for removing previously inserted items.

mod filter;
mod sub_filter;

pub use self::filter::{CuckooFilter, CuckooKey};
