use std::ops::Index;

use super::super::address::{ADDRESS_BITS, Address};

/// Which child of a node to follow: the value of one address bit.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Branch(u8);

impl Branch {
	pub const ZERO: Self = Self(0);
	pub const ONE: Self = Self(1);

	const fn of(bit: bool) -> Self {
		Self(bit as u8)
	}

	pub fn is_one(self) -> bool {
		self.0 == 1
	}
}

/// An array of children that can be indexed exactly by a `Branch`.
#[derive(Debug, Default)]
pub struct Branches<T>([T; 2]);

impl<T> Index<Branch> for Branches<T> {
	type Output = T;

	fn index(&self, key: Branch) -> &T {
		&self.0[usize::from(key.0)]
	}
}

/// An iterator over the `Branch`es of the path to an address, most significant bit first.
pub struct AddressPath {
	address: Address,
	bit_index: u8,
	length: u8,
}

impl AddressPath {
	/// The full path, one branch per address bit.
	pub fn new(address: Address) -> Self {
		Self::prefix(address, ADDRESS_BITS)
	}

	/// The first `length` branches of the path.
	pub fn prefix(address: Address, length: u8) -> Self {
		debug_assert!(length <= ADDRESS_BITS);

		Self {
			address,
			bit_index: 0,
			length,
		}
	}
}

impl Iterator for AddressPath {
	type Item = Branch;

	fn next(&mut self) -> Option<Self::Item> {
		if self.bit_index == self.length {
			return None;
		}

		let bit = self.address.bit(self.bit_index);

		self.bit_index += 1;

		Some(Branch::of(bit))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = usize::from(self.length - self.bit_index);
		(remaining, Some(remaining))
	}
}

impl ExactSizeIterator for AddressPath {}
