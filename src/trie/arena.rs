use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::path::{Branch, Branches};

/// log2 of the number of nodes in the first segment.
const FIRST_SEGMENT_BITS: u32 = 6;

/// Segment `n` holds `1 << (FIRST_SEGMENT_BITS + n)` nodes, so this many segments cover every `u32` id.
const SEGMENTS: usize = 33 - FIRST_SEGMENT_BITS as usize;

/// The position of a node in an `Arena`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
	/// The root is never anyone’s child, so its id doubles as the “no child” link.
	pub const ROOT: Self = Self(0);

	/// The id following this one, or `None` if the id space is used up.
	pub fn next(self) -> Option<Self> {
		self.0.checked_add(1).map(Self)
	}

	pub fn count(self) -> usize {
		self.0 as usize
	}
}

#[derive(Debug, Default)]
pub struct Node {
	terminal: AtomicBool,
	children: Branches<AtomicU32>,
}

impl Node {
	pub fn is_terminal(&self) -> bool {
		self.terminal.load(Ordering::Acquire)
	}

	pub fn mark_terminal(&self) {
		self.terminal.store(true, Ordering::Release);
	}

	pub fn child(&self, branch: Branch) -> Option<NodeId> {
		match self.children[branch].load(Ordering::Acquire) {
			0 => None,
			id => Some(NodeId(id)),
		}
	}

	/// Makes `child` reachable. Everything written to it beforehand is visible to readers that follow the link.
	pub fn link(&self, branch: Branch, child: NodeId) {
		debug_assert!(child != NodeId::ROOT);
		self.children[branch].store(child.0, Ordering::Release);
	}
}

/// Nodes addressed by `NodeId`, stored in segments of doubling size that never move once created.
#[derive(Debug)]
pub struct Arena {
	segments: [OnceLock<Box<[Node]>>; SEGMENTS],
}

impl Arena {
	pub fn new() -> Self {
		Self {
			segments: std::array::from_fn(|_| OnceLock::new()),
		}
	}

	/// The segment and offset within it of a node.
	fn locate(id: NodeId) -> (usize, usize) {
		let position = u64::from(id.0) + (1 << FIRST_SEGMENT_BITS);
		let magnitude = 63 - position.leading_zeros();

		(
			(magnitude - FIRST_SEGMENT_BITS) as usize,
			(position - (1 << magnitude)) as usize,
		)
	}

	pub fn get(&self, id: NodeId) -> Option<&Node> {
		let (segment, offset) = Self::locate(id);
		self.segments[segment].get().map(|nodes| &nodes[offset])
	}

	/// Gets the node for an id that was never handed out before, creating its segment if needed. Must only be called by the single writer.
	pub fn allocate(&self, id: NodeId) -> &Node {
		let (segment, offset) = Self::locate(id);

		let nodes = self.segments[segment].get_or_init(|| {
			let size = 1_usize << (FIRST_SEGMENT_BITS as usize + segment);
			(0..size).map(|_| Node::default()).collect()
		});

		&nodes[offset]
	}
}

#[cfg(test)]
mod tests {
	use super::{Arena, FIRST_SEGMENT_BITS, NodeId, SEGMENTS};

	#[test]
	fn segments_are_contiguous() {
		let first = 1_u32 << FIRST_SEGMENT_BITS;

		assert_eq!(Arena::locate(NodeId(0)), (0, 0));
		assert_eq!(Arena::locate(NodeId(first - 1)), (0, (first - 1) as usize));
		assert_eq!(Arena::locate(NodeId(first)), (1, 0));
		assert_eq!(Arena::locate(NodeId(3 * first - 1)), (1, (2 * first - 1) as usize));
		assert_eq!(Arena::locate(NodeId(3 * first)), (2, 0));
		assert_eq!(Arena::locate(NodeId(u32::MAX)).0, SEGMENTS - 1);
	}

	#[test]
	fn allocated_nodes_are_found() {
		let arena = Arena::new();

		assert!(arena.get(NodeId(100)).is_none());

		arena.allocate(NodeId(100)).mark_terminal();

		assert!(arena.get(NodeId(100)).unwrap().is_terminal());
		assert!(!arena.get(NodeId(101)).unwrap().is_terminal());
	}
}
