use std::collections::HashMap;

/// Weight of the instantaneous delta in the blended update
pub const INSTANT_BLEND: f64 = 0.7;
/// Weight of the smoothed momentum in the blended update
pub const MOMENTUM_BLEND: f64 = 0.3;

/// Indices this far past the dense table's end switch it to sparse storage
const DENSE_GROWTH_LIMIT: usize = 1 << 16;

/// Per-weight exponential momentum, indexed by weight position.
///
/// Weight arrays are usually contiguous `0..n`, so storage starts dense and
/// only falls back to a map when an index lands far past the end.
#[derive(Debug, Clone)]
pub enum MomentumTable {
    Dense(Vec<f64>),
    Sparse(HashMap<usize, f64>),
}

impl Default for MomentumTable {
    fn default() -> Self {
        MomentumTable::Dense(Vec::new())
    }
}

impl MomentumTable {
    pub fn with_capacity(len: usize) -> Self {
        MomentumTable::Dense(Vec::with_capacity(len))
    }

    /// `m = decay * m + (1 - decay) * delta`, zero-initialised. Returns the
    /// updated momentum.
    pub fn update(&mut self, index: usize, delta: f64, decay: f64) -> f64 {
        let slot = self.slot_mut(index);
        *slot = decay * *slot + (1.0 - decay) * delta;
        *slot
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            MomentumTable::Dense(v) => v.get(index).copied(),
            MomentumTable::Sparse(m) => m.get(&index).copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MomentumTable::Dense(v) => v.len(),
            MomentumTable::Sparse(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = MomentumTable::default();
    }

    fn slot_mut(&mut self, index: usize) -> &mut f64 {
        if let MomentumTable::Dense(v) = self {
            if index >= v.len() + DENSE_GROWTH_LIMIT {
                let sparse: HashMap<usize, f64> = v.iter().copied().enumerate().collect();
                tracing::debug!(index, entries = sparse.len(), "momentum table switched to sparse");
                *self = MomentumTable::Sparse(sparse);
            }
        }

        match self {
            MomentumTable::Dense(v) => {
                if index >= v.len() {
                    v.resize(index + 1, 0.0);
                }
                &mut v[index]
            }
            MomentumTable::Sparse(m) => m.entry(index).or_insert(0.0),
        }
    }
}

/// Fixed blend of the raw delta and its smoothed momentum
#[inline]
pub fn blend(delta: f64, momentum: f64) -> f64 {
    INSTANT_BLEND * delta + MOMENTUM_BLEND * momentum
}
