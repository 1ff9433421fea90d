//! Size-classed byte buffer recycling.
//!
//! The frame reader and response writer check buffers out of a shared
//! [`BufferPool`] and hand them back when a request is done with them. The
//! pool is purely an allocation cache: dropping a buffer instead of releasing
//! it is always correct.

use crossbeam::queue::ArrayQueue;

/// Buffers whose capacity grew past this are dropped on release instead of
/// being retained.
pub const MAX_POOLED_CAPACITY: usize = 16 * 1024;

/// Default number of idle buffers kept per size class.
pub const DEFAULT_RETAINED_PER_CLASS: usize = 256;

/// Capacity tier of a pooled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// 1 KiB, used to serialize responses.
    Small,
    /// 4 KiB, used for individual socket reads.
    Medium,
    /// 8 KiB, used to accumulate a header block.
    Large,
}

impl SizeClass {
    const ALL: [SizeClass; 3] = [SizeClass::Small, SizeClass::Medium, SizeClass::Large];

    /// Minimum capacity of any buffer handed out for this class.
    pub const fn capacity(self) -> usize {
        match self {
            SizeClass::Small => 1024,
            SizeClass::Medium => 4 * 1024,
            SizeClass::Large => 8 * 1024,
        }
    }

    const fn index(self) -> usize {
        match self {
            SizeClass::Small => 0,
            SizeClass::Medium => 1,
            SizeClass::Large => 2,
        }
    }

    /// The largest class whose minimum capacity `capacity` satisfies.
    fn fitting(capacity: usize) -> Option<SizeClass> {
        SizeClass::ALL
            .iter()
            .rev()
            .copied()
            .find(|class| class.capacity() <= capacity)
    }
}

/// A concurrent pool of reusable `Vec<u8>` buffers.
#[derive(Debug)]
pub struct BufferPool {
    queues: [ArrayQueue<Vec<u8>>; 3],
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_PER_CLASS)
    }

    /// Creates a pool keeping at most `per_class` idle buffers in each size
    /// class.
    pub fn with_retention(per_class: usize) -> Self {
        let per_class = per_class.max(1);
        Self {
            queues: [
                ArrayQueue::new(per_class),
                ArrayQueue::new(per_class),
                ArrayQueue::new(per_class),
            ],
        }
    }

    /// Checks out an empty buffer with at least `class.capacity()` bytes of
    /// capacity.
    pub fn acquire(&self, class: SizeClass) -> Vec<u8> {
        self.queues[class.index()]
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(class.capacity()))
    }

    /// Returns a buffer to the pool.
    ///
    /// The buffer is cleared first. Buffers above [`MAX_POOLED_CAPACITY`],
    /// below the smallest class, or arriving when their class is full are
    /// dropped.
    pub fn release(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > MAX_POOLED_CAPACITY {
            return;
        }

        let Some(class) = SizeClass::fitting(buffer.capacity()) else {
            return;
        };

        buffer.clear();
        let _ = self.queues[class.index()].push(buffer);
    }

    /// Number of idle buffers currently held for `class`.
    pub fn retained(&self, class: SizeClass) -> usize {
        self.queues[class.index()].len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitting_picks_largest_satisfied_class() {
        assert_eq!(SizeClass::fitting(512), None);
        assert_eq!(SizeClass::fitting(1024), Some(SizeClass::Small));
        assert_eq!(SizeClass::fitting(5000), Some(SizeClass::Medium));
        assert_eq!(SizeClass::fitting(16 * 1024), Some(SizeClass::Large));
    }
}
