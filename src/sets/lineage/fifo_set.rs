use std::collections::VecDeque;

/// A FIFO (First-In-First-Out) bounded history with deduplication.
///
/// Maintains up to `CAPACITY` unique entries, evicting the oldest entry when
/// capacity is exceeded. Reinserting an existing element removes its old position
/// and adds it as the newest entry, maintaining set semantics.
///
/// # Panics
/// Creating a `FifoSet` with `CAPACITY == 0` will panic
#[derive(Clone)]
pub struct FifoSet<T, const CAPACITY: usize> {
    queue: VecDeque<T>,
}

impl<T: Copy + PartialEq, const CAPACITY: usize> FifoSet<T, CAPACITY> {
    pub fn new() -> Self {
        assert!(CAPACITY > 0);
        FifoSet {
            queue: VecDeque::with_capacity(CAPACITY),
        }
    }

    pub fn insert(&mut self, key: T) {
        // Remove any existing occurrence of the key to maintain set behavior
        if let Some(pos) = self.queue.iter().position(|&x| x == key) {
            self.queue.remove(pos);
        }

        if self.queue.len() == CAPACITY {
            self.queue.pop_front();
        }

        self.queue.push_back(key);
    }

    pub fn contains(&self, key: T) -> bool {
        self.queue.contains(&key)
    }

    /// The most recently inserted entry.
    pub fn newest(&self) -> Option<T> {
        self.queue.back().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.queue.iter().copied().collect()
    }
}

impl<T: Copy + PartialEq, const CAPACITY: usize> Default for FifoSet<T, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug, const CAPACITY: usize> std::fmt::Debug for FifoSet<T, CAPACITY> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoSet")
            .field("capacity", &CAPACITY)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_beyond_capacity_evicts_oldest() {
        let mut fifo = FifoSet::<u32, 3>::new();
        for i in 1..=4 {
            fifo.insert(i);
        }
        assert_eq!(fifo.to_vec(), vec![2, 3, 4]);
        assert_eq!(fifo.newest(), Some(4));
    }

    #[test]
    fn duplicate_insertion_moves_to_back() {
        let mut fifo = FifoSet::<u32, 3>::new();
        fifo.insert(1);
        fifo.insert(2);
        fifo.insert(3);
        fifo.insert(2);
        assert_eq!(fifo.to_vec(), vec![1, 3, 2]);
        assert_eq!(fifo.len(), 3);
    }

    #[test]
    fn contains_tracks_evictions() {
        let mut fifo = FifoSet::<u32, 2>::new();
        fifo.insert(5);
        fifo.insert(6);
        fifo.insert(7);
        assert!(!fifo.contains(5));
        assert!(fifo.contains(6));
        assert!(fifo.contains(7));
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _fifo = FifoSet::<u32, 0>::new();
    }

    #[test]
    fn test_debug() {
        let mut fifo = FifoSet::<u32, 3>::new();
        fifo.insert(1);
        fifo.insert(2);

        let debug_str = format!("{fifo:?}");
        assert_eq!(debug_str, "FifoSet { capacity: 3, queue: [1, 2] }");
    }

    #[test]
    fn test_default_is_empty() {
        let fifo: FifoSet<u32, 5> = FifoSet::default();
        assert!(fifo.is_empty());
    }
}
