// Bounded per-channel history for the live time-series display

use std::collections::VecDeque;
use std::collections::vec_deque::Iter;

/// Fixed-length FIFO window. Oldest element is evicted on overflow.
///
/// Iteration order is display order: oldest to newest.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    max_points: usize,
}

impl<T> RollingWindow<T> {
    /// # Panics
    /// Panics if `max_points` is zero.
    pub fn new(max_points: usize) -> Self {
        assert!(max_points > 0, "RollingWindow max_points must be greater than 0");
        Self {
            items: VecDeque::with_capacity(max_points),
            max_points,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.max_points {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    /// Most recently pushed element
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> RollingWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Presentation-side state: one window per channel plus the latest rates.
///
/// Only written with rate-engine output, through [`DisplayBoard::record`].
#[derive(Debug, Clone)]
pub struct DisplayBoard {
    windows: Vec<RollingWindow<f64>>,
    latest: Vec<f64>,
}

impl DisplayBoard {
    pub fn new(channel_count: usize, max_points: usize) -> Self {
        Self {
            windows: (0..channel_count)
                .map(|_| RollingWindow::new(max_points))
                .collect(),
            latest: vec![0.0; channel_count],
        }
    }

    /// Record one rate per channel. Caller guarantees `rates.len()` matches.
    pub fn record(&mut self, rates: &[f64]) {
        debug_assert_eq!(rates.len(), self.windows.len());
        for (window, &rate) in self.windows.iter_mut().zip(rates) {
            window.push(rate);
        }
        self.latest.copy_from_slice(rates);
    }

    pub fn reset(&mut self) {
        for window in &mut self.windows {
            window.reset();
        }
        self.latest.fill(0.0);
    }

    pub fn windows(&self) -> &[RollingWindow<f64>] {
        &self.windows
    }

    pub fn latest(&self) -> &[f64] {
        &self.latest
    }
}
