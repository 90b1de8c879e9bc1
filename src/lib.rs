//! Address range ban lists.
//!
//! Ranges of IPv4 and IPv6 addresses are kept in a binary trie over the 128 bits of an address, so inserting a range and testing an address both take at most 128 steps however many ranges are stored. Ranges covered by one already present aren’t stored again.
//!
//! `guard::Guard` wraps the trie for request handling: it asks a `Banner` whether unknown addresses should be banned and appends new bans to a `store::Store` file.

#[cfg(test)]
#[macro_use]
extern crate quickcheck_macros;

pub mod address;
pub mod error;
pub mod guard;
pub mod protocol;
pub mod range_set;
pub mod store;
pub mod trie;

pub use self::address::{Address, AddressError, RangedAddress};
pub use self::error::Error;
pub use self::range_set::{RangeList, RangeSet};
pub use self::trie::RangeTrie;
