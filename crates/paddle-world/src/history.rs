use std::collections::VecDeque;

/// The most recent ball positions, oldest first.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    capacity: usize,
    positions: VecDeque<(i32, i32)>,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        PositionHistory {
            capacity,
            positions: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append a position, dropping the oldest one when full.
    pub fn push(&mut self, position: (i32, i32)) {
        self.positions.push_back(position);
        while self.positions.len() > self.capacity {
            self.positions.pop_front();
        }
    }

    pub fn positions(&self) -> Vec<(i32, i32)> {
        self.positions.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<(i32, i32)> {
        self.positions.back().copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Change the capacity, evicting the oldest positions if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.positions.len() > self.capacity {
            self.positions.pop_front();
        }
    }
}
