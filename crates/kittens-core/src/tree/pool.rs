//! Reusable buffers for child node lists.

use super::node::GameNode;

/// Buffers kept per size class before extra ones are dropped.
const MAX_BUFFERS_PER_CLASS: usize = 64;
const SIZE_CLASSES: usize = usize::BITS as usize;

/// Free lists of child buffers, bucketed by power-of-two capacity.
///
/// Exhaustive walks build and release children constantly; recycling the
/// buffers keeps the allocator out of the hot loop.
#[derive(Debug)]
pub struct ChildPool {
    classes: Vec<Vec<Vec<GameNode>>>,
    reused: u64,
    allocated: u64,
}

impl Default for ChildPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildPool {
    pub fn new() -> Self {
        Self {
            classes: (0..SIZE_CLASSES).map(|_| Vec::new()).collect(),
            reused: 0,
            allocated: 0,
        }
    }

    fn class_of(capacity: usize) -> usize {
        capacity.max(1).next_power_of_two().trailing_zeros() as usize
    }

    /// An empty buffer able to hold at least `capacity` nodes.
    pub fn take(&mut self, capacity: usize) -> Vec<GameNode> {
        let class = Self::class_of(capacity);
        if let Some(buffer) = self.classes[class].pop() {
            self.reused += 1;
            return buffer;
        }
        self.allocated += 1;
        Vec::with_capacity(1usize << class)
    }

    /// Returns a buffer to the pool. Nodes still inside are dropped.
    pub fn give(&mut self, mut buffer: Vec<GameNode>) {
        buffer.clear();
        let capacity = buffer.capacity();
        if capacity == 0 || !capacity.is_power_of_two() {
            return;
        }
        let class = Self::class_of(capacity);
        if self.classes[class].len() < MAX_BUFFERS_PER_CLASS {
            self.classes[class].push(buffer);
        }
    }

    pub fn reused(&self) -> u64 {
        self.reused
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn pooled(&self) -> usize {
        self.classes.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::ChildPool;

    #[test]
    fn buffers_are_recycled_by_class() {
        let mut pool = ChildPool::new();
        let buffer = pool.take(5);
        assert!(buffer.capacity() >= 8);
        pool.give(buffer);
        assert_eq!(pool.pooled(), 1);
        let again = pool.take(7);
        assert_eq!(pool.reused(), 1);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.pooled(), 0);
        pool.give(again);
        let bigger = pool.take(9);
        assert!(bigger.capacity() >= 16);
        assert_eq!(pool.allocated(), 2);
    }
}
