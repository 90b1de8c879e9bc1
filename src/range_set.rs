use std::sync::{PoisonError, RwLock};

use super::address::{Address, RangedAddress};
use super::trie::RangeTrie;

/// A set of address ranges supporting insertion and membership tests.
pub trait RangeSet: Send + Sync {
	/// Returns `false` if a range covering `range` was already in the set.
	fn insert(&self, range: &RangedAddress) -> bool;

	fn has(&self, address: &Address) -> bool;

	/// Ranges that, inserted into an empty set, reproduce this set’s membership.
	fn entries(&self) -> Vec<RangedAddress>;
}

impl RangeSet for RangeTrie {
	fn insert(&self, range: &RangedAddress) -> bool {
		RangeTrie::insert(self, range)
	}

	fn has(&self, address: &Address) -> bool {
		RangeTrie::has(self, address)
	}

	fn entries(&self) -> Vec<RangedAddress> {
		RangeTrie::entries(self).collect()
	}
}

/// Ranges in a flat list, checked one by one. Linear in the number of ranges.
#[derive(Debug, Default)]
pub struct RangeList {
	ranges: RwLock<Vec<RangedAddress>>,
}

impl RangeList {
	pub fn new() -> Self {
		Self::default()
	}
}

impl RangeSet for RangeList {
	fn insert(&self, range: &RangedAddress) -> bool {
		let mut ranges = self.ranges.write().unwrap_or_else(PoisonError::into_inner);

		if ranges.iter().any(|existing| existing.covers(range)) {
			return false;
		}

		ranges.retain(|existing| !range.covers(existing));
		ranges.push(*range);
		true
	}

	fn has(&self, address: &Address) -> bool {
		self.ranges.read().unwrap_or_else(PoisonError::into_inner)
			.iter()
			.any(|range| range.contains(address))
	}

	fn entries(&self) -> Vec<RangedAddress> {
		self.ranges.read().unwrap_or_else(PoisonError::into_inner).clone()
	}
}
