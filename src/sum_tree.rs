use std::fmt;
use std::ops::Index;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SumTreeError;

/// A binary tree data structure where each parent node is the sum of its child nodes
///
/// The tree is stored as a flat array of `2 * capacity - 1` nodes in level order:
/// the root sits at index 0, the children of node `i` at `2i + 1` and `2i + 2`, and
/// the leaves occupy the last `capacity` slots. Only leaves carry user weights; every
/// internal node is the sum of its subtree, so the root is the total.
///
/// [`add`](SumTree::add) writes through a wrapping cursor, so once all `capacity`
/// slots have been used the oldest leaf is overwritten. There is no removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumTree {
    tree: Vec<f64>,
    capacity: usize,
    write: usize,
    len: usize,
}

impl SumTree {
    /// Initialize a new zero-filled `SumTree` with a given leaf capacity
    pub fn new(capacity: usize) -> Result<Self, SumTreeError> {
        if capacity == 0 {
            return Err(SumTreeError::InvalidCapacity);
        }
        Ok(Self {
            tree: vec![0.0; 2 * capacity - 1],
            capacity,
            write: 0,
            len: 0,
        })
    }

    /// Tree index of the leftmost leaf
    fn first_leaf(&self) -> usize {
        self.capacity - 1
    }

    /// Get the sum of all leaf values
    pub fn total(&self) -> f64 {
        self.tree[0]
    }

    /// Get the maximal number of leaves the tree can store
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of leaves written so far, saturating at capacity
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the value stored at a leaf number
    pub fn value(&self, leaf_num: usize) -> Result<f64, SumTreeError> {
        if leaf_num >= self.capacity {
            return Err(SumTreeError::IndexOutOfBounds {
                index: leaf_num,
                capacity: self.capacity,
            });
        }
        Ok(self.tree[leaf_num + self.first_leaf()])
    }

    /// Insert a value at the write cursor, overwriting the oldest leaf once the
    /// tree is full
    pub fn add(&mut self, value: f64) {
        self.write_leaf(self.write, value);
        self.write = (self.write + 1) % self.capacity;
        self.len = usize::min(self.len + 1, self.capacity);
    }

    /// Update the value at a leaf number
    ///
    /// The change is propagated up to the root, restoring the sum invariant in
    /// O(log capacity).
    pub fn update(&mut self, leaf_num: usize, value: f64) -> Result<(), SumTreeError> {
        if leaf_num >= self.capacity {
            return Err(SumTreeError::IndexOutOfBounds {
                index: leaf_num,
                capacity: self.capacity,
            });
        }
        self.write_leaf(leaf_num, value);
        Ok(())
    }

    /// Apply [`update`](SumTree::update) to each leaf/value pair in order
    ///
    /// Equivalent to the corresponding sequence of single updates; a repeated leaf
    /// number keeps the last value. The whole batch is validated up front, so a
    /// failed call leaves the tree untouched.
    pub fn update_batched(
        &mut self,
        leaf_nums: &[usize],
        values: &[f64],
    ) -> Result<(), SumTreeError> {
        if leaf_nums.len() != values.len() {
            return Err(SumTreeError::LengthMismatch {
                leaf_nums: leaf_nums.len(),
                values: values.len(),
            });
        }
        if let Some(&index) = leaf_nums.iter().find(|&&ix| ix >= self.capacity) {
            return Err(SumTreeError::IndexOutOfBounds {
                index,
                capacity: self.capacity,
            });
        }
        for (&leaf_num, &value) in leaf_nums.iter().zip(values) {
            self.write_leaf(leaf_num, value);
        }
        Ok(())
    }

    /// Write a value into a leaf and add the change to every ancestor
    ///
    /// Callers must have validated `leaf_num < capacity`.
    fn write_leaf(&mut self, leaf_num: usize, value: f64) {
        let mut ix = leaf_num + self.first_leaf();
        let change = value - self.tree[ix];

        self.tree[ix] = value;

        while ix > 0 {
            ix = (ix - 1) / 2;
            self.tree[ix] += change;
        }
    }

    /// Find the leaf corresponding to a cumulative sum
    ///
    /// Descends from the root, routing left when `cumsum` is less than or equal to
    /// the left subtree's sum and otherwise subtracting that sum and routing right.
    /// A `cumsum` above [`total`](SumTree::total) resolves to the rightmost leaf
    /// through the same comparisons rather than erroring.
    ///
    /// Returns the leaf number and its stored value. Drawing `cumsum` uniformly
    /// from `[0, total]` selects each leaf with probability proportional to its
    /// value.
    pub fn get(&self, mut cumsum: f64) -> (usize, f64) {
        let mut ix = 0;
        while ix < self.first_leaf() {
            let left = 2 * ix + 1;
            if cumsum <= self.tree[left] {
                ix = left;
            } else {
                ix = left + 1;
                cumsum -= self.tree[left];
            }
        }
        (ix - self.first_leaf(), self.tree[ix])
    }

    /// Sample `n` leaves, each with probability proportional to its value
    ///
    /// The same leaf may be sampled multiple times. Returns the leaf numbers and
    /// their values.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> (Vec<usize>, Vec<f64>) {
        let total = self.total();
        let mut leaves = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            let (leaf_num, value) = self.get(rng.gen::<f64>() * total);
            leaves.push(leaf_num);
            values.push(value);
        }
        (leaves, values)
    }

    /// Sample `n` leaves, one from each of `n` equal slices of the total
    ///
    /// If the total is 60 and `n` is 3, one leaf is drawn in `[0, 20)`, one in
    /// `[20, 40)`, and one in `[40, 60)`.
    pub fn sample_stratified<R: Rng>(&self, n: usize, rng: &mut R) -> (Vec<usize>, Vec<f64>) {
        let stride = self.total() / n as f64;
        let mut leaves = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        let mut lower = 0.0;
        for _ in 0..n {
            let (leaf_num, value) = self.get(rng.gen::<f64>() * stride + lower);
            leaves.push(leaf_num);
            values.push(value);
            lower += stride;
        }
        (leaves, values)
    }

    /// Encode the tree into a compact byte form
    pub fn to_bytes(&self) -> Result<Vec<u8>, SumTreeError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a tree previously encoded with [`to_bytes`](SumTree::to_bytes)
    ///
    /// Fails on malformed bytes and on decoded states that violate the structural
    /// invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SumTreeError> {
        let tree: Self = bincode::deserialize(bytes)?;
        tree.check_consistency()?;
        Ok(tree)
    }

    fn check_consistency(&self) -> Result<(), SumTreeError> {
        if self.capacity == 0 {
            return Err(SumTreeError::Corrupt("zero capacity"));
        }
        if self.tree.len() != 2 * self.capacity - 1 {
            return Err(SumTreeError::Corrupt("node count does not match capacity"));
        }
        if self.write >= self.capacity {
            return Err(SumTreeError::Corrupt("write cursor out of range"));
        }
        if self.len > self.capacity {
            return Err(SumTreeError::Corrupt("length exceeds capacity"));
        }
        Ok(())
    }
}

impl Index<usize> for SumTree {
    type Output = f64;

    /// Raw leaf read; panics on a leaf number at or above capacity
    fn index(&self, index: usize) -> &Self::Output {
        assert!(
            index < self.capacity,
            "leaf number {} is out of bounds for a tree with {} leaves",
            index,
            self.capacity,
        );
        &self.tree[index + self.first_leaf()]
    }
}

impl fmt::Display for SumTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SumTree(capacity={}, total={:.3}, [ ",
            self.capacity,
            self.total()
        )?;
        for ix in self.first_leaf()..self.first_leaf() + self.len {
            write!(f, "{:.3} ", self.tree[ix])?;
        }
        write!(f, "])")
    }
}
