mod arena;
mod path;


use std::sync::{Mutex, PoisonError};

use super::address::{ADDRESS_BITS, ADDRESS_BYTES, Address, RangedAddress};
use self::arena::{Arena, Node, NodeId};
use self::path::{AddressPath, Branch};

/// A binary trie over address bits, most significant first. A terminal node at depth `n` means every address sharing its `n`-bit path is in the set.
///
/// Lookups and enumeration don’t lock; inserts are serialized by an internal mutex.
#[derive(Debug)]
pub struct RangeTrie {
	nodes: Arena,

	/// The next unused node id. Held for the duration of an insert.
	writer: Mutex<NodeId>,
}

impl RangeTrie {
	pub fn new() -> Self {
		let nodes = Arena::new();
		nodes.allocate(NodeId::ROOT);

		Self {
			nodes,
			writer: Mutex::new(NodeId::ROOT.next().expect("root id has a successor")),
		}
	}

	fn root(&self) -> &Node {
		self.node(NodeId::ROOT)
	}

	fn node(&self, id: NodeId) -> &Node {
		self.nodes.get(id).expect("linked node was never allocated")
	}

	/// Adds a range, returning whether the set changed. Does nothing if a range covering it was already inserted.
	pub fn insert(&self, range: &RangedAddress) -> bool {
		// An insert never leaves the trie half-updated, so a panic elsewhere doesn’t invalidate it.
		let mut next_id = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		let mut current = self.root();

		for branch in AddressPath::prefix(*range.address(), range.prefix_length()) {
			if current.is_terminal() {
				return false;
			}

			current =
				match current.child(branch) {
					Some(id) => self.node(id),
					None => {
						let id = *next_id;
						*next_id = id.next().expect("trie node ids exhausted");

						let child = self.nodes.allocate(id);
						current.link(branch, id);
						child
					},
				};
		}

		if current.is_terminal() {
			return false;
		}

		current.mark_terminal();
		true
	}

	/// Whether any inserted range contains the address.
	pub fn has(&self, address: &Address) -> bool {
		let mut current = self.root();

		for branch in AddressPath::new(*address) {
			if current.is_terminal() {
				return true;
			}

			current =
				match current.child(branch).and_then(|id| self.nodes.get(id)) {
					Some(child) => child,
					None => return false,
				};
		}

		current.is_terminal()
	}

	/// The number of nodes allocated so far, including the root.
	pub fn node_count(&self) -> usize {
		self.writer.lock().unwrap_or_else(PoisonError::into_inner).count()
	}

	/// The ranges in the set, in ascending order, leaving out ranges absorbed by broader ones.
	pub fn entries(&self) -> Entries<'_> {
		Entries {
			trie: self,
			pending: vec![(NodeId::ROOT, Address::new([0; ADDRESS_BYTES]), 0)],
		}
	}
}

impl Default for RangeTrie {
	fn default() -> Self {
		Self::new()
	}
}

/// A depth-first walk over the terminal nodes of a `RangeTrie`.
pub struct Entries<'a> {
	trie: &'a RangeTrie,

	/// Nodes still to visit, with the address bits and depth leading to each.
	pending: Vec<(NodeId, Address, u8)>,
}

impl<'a> Iterator for Entries<'a> {
	type Item = RangedAddress;

	fn next(&mut self) -> Option<Self::Item> {
		while let Some((id, address, depth)) = self.pending.pop() {
			let node =
				match self.trie.nodes.get(id) {
					Some(node) => node,
					None => continue,
				};

			if node.is_terminal() {
				return Some(
					RangedAddress::new(address, depth)
						.expect("trie depth never exceeds the address length")
				);
			}

			if depth == ADDRESS_BITS {
				continue;
			}

			// One first, so zero is visited first.
			for &branch in &[Branch::ONE, Branch::ZERO] {
				if let Some(child) = node.child(branch) {
					let mut child_address = address;

					if branch.is_one() {
						child_address.set_bit(depth);
					}

					self.pending.push((child, child_address, depth + 1));
				}
			}
		}

		None
	}
}
