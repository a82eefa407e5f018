//! # scaling-filters
//!
//! [![Documentation](https://docs.rs/scaling-filters/badge.svg)](https://docs.rs/scaling-filters)
//! [![License: MIT](https://img.shields.io/badge/License-MIT-yellow.svg)](https://opensource.org/licenses/MIT)
//!
//! `scaling-filters` implements two probabilistic set-membership data structures meant to be
//! embedded in a higher-level service (a cache, a database, a query accelerator) as in-process
//! library primitives:
//!
//! - [`bloom`]: a scaling bloom filter. No false negatives, bounded false positives, no
//!   deletion. Grows by appending new, tighter sub-filters as the active one fills.
//! - [`cuckoo`]: a scaling cuckoo filter. Fingerprint-based, supports deletion, grows by
//!   appending new, larger sub-filters when eviction exhausts its iteration budget.
//!
//! Both engines share a single hashing scheme ([`hash`]) and report every failure through
//! [`error`] rather than retrying or logging internally. Neither engine is thread-safe on its
//! own; an embedder that shares a filter across threads must provide its own synchronization.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! scaling-filters = "*"
//! ```
//!
//! ```rust
//! use scaling_filters::bloom::{BloomFilter, BloomOptions};
//!
//! let mut filter = BloomFilter::init(1000, 0.01, BloomOptions::none()).unwrap();
//! filter.add(&"alice").unwrap();
//! assert!(filter.check(&"alice"));
//! ```
//!
//! ## References
//!
//!  - [Scalable Bloom Filters](https://dl.acm.org/citation.cfm?id=1224501)
//!  > Almeida, Paulo Sérgio, Carlos Baquero, Nuno Preguiça, and David Hutchison. 2007. “Scalable Bloom Filters.” *Inf. Process. Lett.* 101 (6). Amsterdam, The Netherlands, The Netherlands: Elsevier North-Holland, Inc.: 255–61. doi:[10.1016/j.ipl.2006.10.007](https://doi.org/10.1016/j.ipl.2006.10.007).
//!  - [Cuckoo Filter: Practically Better Than Bloom](https://dl.acm.org/citation.cfm?id=2674994)
//!  > Fan, Bin, Dave G. Andersen, Michael Kaminsky, and Michael D. Mitzenmacher. 2014. “Cuckoo Filter: Practically Better Than Bloom.” In *Proceedings of the 10th Acm International on Conference on Emerging Networking Experiments and Technologies*, 75–88. CoNEXT ’14. New York, NY, USA: ACM. doi:[10.1145/2674005.2674994](https://doi.org/10.1145/2674005.2674994).
//!  - [Less hashing, same performance: Building a better Bloom filter](https://dl.acm.org/citation.cfm?id=1400125)
//!  > Kirsch, Adam, and Michael Mitzenmacher. 2008. “Less Hashing, Same Performance: Building a Better Bloom Filter.” *Random Struct. Algorithms* 33 (2). New York, NY, USA: John Wiley & Sons, Inc.: 187–218. doi:[10.1002/rsa.v33:2](https://doi.org/10.1002/rsa.v33:2).

#![warn(missing_docs)]

pub mod bit_vec;
pub mod bloom;
pub mod cuckoo;
pub mod error;
pub mod hash;
