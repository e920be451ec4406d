/// Fixed-capacity circular buffer.
///
/// Pushing into a full ring overwrites the oldest slot in place; nothing is
/// ever shifted. `len()` is the running fill count, capped at capacity.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<f64>,
    /// Next slot to write
    head: usize,
    filled: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)],
            head: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.slots.len();
        if self.filled < self.slots.len() {
            self.filled += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Most recently pushed value
    pub fn latest(&self) -> Option<f64> {
        if self.filled == 0 {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        Some(self.slots[idx])
    }

    /// Filled values, oldest first
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.slots.len();
        let start = (self.head + cap - self.filled) % cap;
        (0..self.filled).map(move |i| self.slots[(start + i) % cap])
    }

    /// Population mean and standard deviation of the filled portion.
    /// `epsilon` is added to the variance before the square root.
    pub fn mean_std(&self, epsilon: f64) -> (f64, f64) {
        if self.filled == 0 {
            return (0.0, epsilon.sqrt());
        }
        let n = self.filled as f64;
        let mean = self.iter().sum::<f64>() / n;
        let variance = self.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, (variance + epsilon).sqrt())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
        self.head = 0;
        self.filled = 0;
    }
}
