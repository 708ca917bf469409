//! Moving-average smoothing of per-phrase scores

use std::collections::VecDeque;

/// Bounded FIFO of recent scores for one wake phrase
#[derive(Debug, Clone)]
pub struct ScoreWindow {
    capacity: usize,
    values: VecDeque<f32>,
}

impl ScoreWindow {
    /// Create an empty window holding at most `capacity` scores
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a score, evicting the oldest when full, and return the new mean
    pub fn push(&mut self, score: f32) -> f32 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(score);
        self.mean()
    }

    /// Arithmetic mean of the window, 0.0 when empty
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    /// Drop all history
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Number of scores held
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scores held, oldest first
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }
}

/// Independent score windows, one per configured wake phrase
///
/// Phrases are addressed by their position in the configured phrase list.
#[derive(Debug, Clone)]
pub struct ScoreSmoother {
    windows: Vec<ScoreWindow>,
}

impl ScoreSmoother {
    /// Create `phrases` windows holding `capacity` scores each
    #[must_use]
    pub fn new(phrases: usize, capacity: usize) -> Self {
        Self {
            windows: vec![ScoreWindow::new(capacity); phrases],
        }
    }

    /// Record a score for phrase `index` and return its current moving average
    ///
    /// Returns `None` if `index` is not a configured phrase.
    pub fn observe(&mut self, index: usize, score: f32) -> Option<f32> {
        self.windows.get_mut(index).map(|window| window.push(score))
    }

    /// Clear the window for phrase `index`
    pub fn reset(&mut self, index: usize) {
        if let Some(window) = self.windows.get_mut(index) {
            window.reset();
        }
    }

    /// Window for phrase `index`
    #[must_use]
    pub fn window(&self, index: usize) -> Option<&ScoreWindow> {
        self.windows.get(index)
    }
}
