use std::vec::IntoIter;

/// An item that can be ranked in a [`SmallestK`] and deduplicated by identity.
///
/// Two items with equal keys describe the same object (the same vertex, the same set of
/// vertices); only the better-ranked of the two is retained.
pub trait Ranked: Ord {
    type Key: Eq;

    fn key(&self) -> Self::Key;
}

/// A bounded collection that maintains the k smallest items by identity.
///
/// Keeps track of the k smallest items seen so far, deduplicating by [`Ranked::key`] and
/// evicting larger items when capacity is exceeded. Items are maintained in sorted order,
/// so the best entry is the first one and the worst retained entry is the last one.
///
/// # Insertion Semantics
/// - If an item with the same key is present and ranks better or equal, the new item is ignored
/// - If an item with the same key is present and ranks worse, it is replaced
/// - If not full, new unique items are inserted in sorted order
/// - If full and the new item is smaller than the current maximum, the maximum is evicted
/// - If full and the new item is larger than or equal to the maximum, it is ignored
///
/// # Time Complexity
/// - `insert`: O(k) (key scan and vector shift), with k the capacity
pub struct SmallestK<T: Ranked> {
    sorted_members: Vec<T>,
    capacity: usize,
}

impl<T: Ranked> SmallestK<T> {
    /// Creates a new empty `SmallestK` with the specified capacity.
    ///
    /// # Panics
    /// Panics if `capacity == 0`
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        SmallestK {
            sorted_members: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts an item, maintaining the k smallest unique elements.
    ///
    /// # Returns
    /// `true` if the item is now part of the collection.
    pub fn insert(&mut self, item: T) -> bool {
        let key = item.key();
        if let Some(pos) = self.sorted_members.iter().position(|m| m.key() == key) {
            if self.sorted_members[pos] <= item {
                return false;
            }
            self.sorted_members.remove(pos);
        }

        let idx = self.sorted_members.partition_point(|m| *m < item);
        if self.sorted_members.len() < self.capacity {
            self.sorted_members.insert(idx, item);
            true
        } else if idx < self.capacity {
            // Full, but the new item beats our current max (last element)
            self.sorted_members.pop();
            self.sorted_members.insert(idx, item);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> Option<&T> {
        self.sorted_members.first()
    }

    pub fn worst(&self) -> Option<&T> {
        self.sorted_members.last()
    }

    pub fn len(&self) -> usize {
        self.sorted_members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sorted_members.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns an iterator over the items in sorted order (smallest to largest).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.sorted_members.iter()
    }
}

impl<T: Ranked> IntoIterator for SmallestK<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        self.sorted_members.into_iter()
    }
}
