/// Fixed-size sliding window over the most recent `N` values.
///
/// Pushing evicts the oldest value and appends the newest at the end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingWindow<const N: usize> {
    values: [f64; N],
}

impl<const N: usize> RollingWindow<N> {
    pub fn new(values: [f64; N]) -> Self {
        Self { values }
    }

    /// Window over the last `N` entries of `history`, or `None` if it is shorter
    pub fn from_tail(history: &[f64]) -> Option<Self> {
        let start = history.len().checked_sub(N)?;
        let values: [f64; N] = history[start..].try_into().ok()?;
        Some(Self { values })
    }

    pub fn push(&mut self, value: f64) {
        if N == 0 {
            return;
        }
        self.values.rotate_left(1);
        if let Some(last) = self.values.last_mut() {
            *last = value;
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}
