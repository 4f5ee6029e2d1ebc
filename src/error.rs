use thiserror::Error;

/// Errors returned by [`SumTree`](crate::SumTree) operations
#[derive(Debug, Error)]
pub enum SumTreeError {
    /// A tree must have at least one leaf
    #[error("capacity must be at least 1")]
    InvalidCapacity,

    /// A leaf number outside `[0, capacity)`
    #[error("leaf number {index} is out of bounds for a tree with {capacity} leaves")]
    IndexOutOfBounds { index: usize, capacity: usize },

    /// The slices passed to a batched update differ in length
    #[error("mismatched batch lengths: {leaf_nums} leaf numbers but {values} values")]
    LengthMismatch { leaf_nums: usize, values: usize },

    /// The persisted byte form could not be decoded
    #[error("malformed sum tree encoding: {0}")]
    Deserialize(#[from] bincode::Error),

    /// A decoded tree violates its structural invariants
    #[error("corrupt sum tree state: {0}")]
    Corrupt(&'static str),
}
