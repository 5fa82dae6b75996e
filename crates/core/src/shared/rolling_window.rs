use std::collections::VecDeque;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RollingWindowError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    #[error("window is full ({capacity} items)")]
    Full { capacity: usize },
    #[error("window is empty")]
    Empty,
    #[error("position {index} is out of bounds for {len} items")]
    OutOfBounds { index: usize, len: usize },
}

/// Fixed-capacity FIFO whose `shove` evicts the oldest element on overflow.
///
/// Position 0 is always the oldest element. Occupancy never exceeds
/// `capacity`.
#[derive(Clone, Debug)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Result<Self, RollingWindowError> {
        if capacity == 0 {
            return Err(RollingWindowError::ZeroCapacity);
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends to the back; refuses when full.
    pub fn push(&mut self, item: T) -> Result<(), RollingWindowError> {
        if self.is_full() {
            return Err(RollingWindowError::Full {
                capacity: self.capacity,
            });
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Appends to the back, evicting and returning the oldest item if the
    /// window was already full.
    pub fn shove(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Removes and returns the oldest item.
    pub fn pop(&mut self) -> Result<T, RollingWindowError> {
        self.items.pop_front().ok_or(RollingWindowError::Empty)
    }

    /// Returns the `n`th item from the front without removing it.
    pub fn peek(&self, n: usize) -> Result<&T, RollingWindowError> {
        self.items.get(n).ok_or(RollingWindowError::OutOfBounds {
            index: n,
            len: self.items.len(),
        })
    }

    /// Inserts `item` at position `n`, moving later items back by one.
    ///
    /// `n` must address an existing item; appending goes through `push`.
    pub fn insert_at(&mut self, n: usize, item: T) -> Result<(), RollingWindowError> {
        if n >= self.items.len() {
            return Err(RollingWindowError::OutOfBounds {
                index: n,
                len: self.items.len(),
            });
        }
        if self.is_full() {
            return Err(RollingWindowError::Full {
                capacity: self.capacity,
            });
        }
        self.items.insert(n, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> RollingWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl RollingWindow<bool> {
    /// Fraction of `true` entries over the current contents; 0.0 when empty.
    pub fn true_ratio(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let hits = self.items.iter().filter(|&&b| b).count();
        hits as f64 / self.items.len() as f64
    }
}
