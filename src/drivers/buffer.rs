use std::collections::VecDeque;
use ndarray::Array2;
use crate::types::{Sample, CHANNEL_COUNT};
/// Samples kept per channel when nothing else is configured (`data_len`).
pub const DEFAULT_CAPACITY: usize = 750;
/// Rolling buffer that stores the most recent samples of every channel.
pub struct RingBuffers {
    per_channel: Vec<VecDeque<f64>>, // channel -> samples
    capacity: usize,
}
impl RingBuffers {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let per_channel = (0..CHANNEL_COUNT)
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();
        Self {
            per_channel,
            capacity,
        }
    }
    /// Samples currently held; every channel has the same length.
    pub fn len(&self) -> usize {
        self.per_channel[0].len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn push(&mut self, sample: &Sample) {
        for (channel_queue, &value) in self.per_channel.iter_mut().zip(&sample.values) {
            if channel_queue.len() == self.capacity {
                channel_queue.pop_front();
            }
            channel_queue.push_back(value);
        }
    }
    /// Most recent `min(n, len)` samples as a `channels x samples` grid, oldest first.
    pub fn latest(&self, n: usize) -> Option<Array2<f64>> {
        let available = self.len();
        if available == 0 {
            return None;
        }
        let take = n.min(available);
        let skip = available - take;
        let mut grid = Array2::zeros((CHANNEL_COUNT, take));
        for (mut row, channel) in grid.outer_iter_mut().zip(&self.per_channel) {
            for (slot, value) in row.iter_mut().zip(channel.iter().skip(skip)) {
                *slot = *value;
            }
        }
        Some(grid)
    }
}
impl Default for RingBuffers {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
