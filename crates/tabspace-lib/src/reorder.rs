use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Moves the element at `from` to position `to`, shifting the elements in
/// between by one. Every other element keeps its relative order.
///
/// Both indices must lie in `0..len`; out-of-range indices are rejected
/// rather than clamped. The input is only borrowed, so a failed call leaves
/// it as it was.
pub fn reorder<T: Clone>(items: &[T], from: usize, to: usize) -> Result<Vec<T>, ReorderError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::IndexOutOfRange { index, len });
        }
    }

    let mut moved = items.to_vec();
    if from != to {
        let item = moved.remove(from);
        moved.insert(to, item);
    }
    Ok(moved)
}
