//! A fixed-capacity, array-backed sum tree for weighted sampling.
//!
//! Every internal node holds the sum of its two children, so the root is the
//! total of all leaf weights. Looking a leaf up by cumulative sum and updating
//! a single weight are both O(log capacity), while insertion overwrites the
//! oldest leaf through a wrapping write cursor. This is the usual backing
//! store for prioritized experience replay.
//!
//! ```
//! use sumtree::SumTree;
//!
//! let mut tree = SumTree::new(8).unwrap();
//! tree.add(4.0);
//! tree.add(6.0);
//! assert_eq!(tree.total(), 10.0);
//! assert_eq!(tree.get(5.0), (1, 6.0));
//! ```

/// Error types
pub mod error;

/// The sum tree itself
pub mod sum_tree;

pub use error::SumTreeError;
pub use sum_tree::SumTree;
