use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Fixed-capacity buffer that drops its oldest element once full.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    size: usize,
    buf: VecDeque<T>,
}

impl<T: Clone> SlidingWindow<T> {
    pub fn new(size: usize) -> Result<SlidingWindow<T>> {
        if size == 0 {
            return Err(Error::InvalidConfig("sliding window size must be positive".into()));
        }
        Ok(SlidingWindow { size, buf: VecDeque::with_capacity(size) })
    }

    /// Appends `item`, evicting the oldest one when full. Returns whether the
    /// window now holds `size` elements.
    pub fn push(&mut self, item: T) -> bool {
        if self.buf.len() == self.size {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.buf.len() == self.size
    }

    /// Contents, oldest first.
    pub fn batch(&self) -> Vec<T> {
        self.buf.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
