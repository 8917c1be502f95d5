use std::collections::VecDeque;

/// Detects when the energy of successive passes has settled.
///
/// Keeps the last `window_size` energies and compares every new energy to a
/// band of `gap_percentage` around the median of the window as it was *before*
/// that energy arrived.
pub(crate) struct PrematureStopMonitor {
    window: VecDeque<f64>,
    window_size: usize,
    gap_percentage: f64,
    last_median: f64,
}

impl PrematureStopMonitor {
    pub(crate) fn new(window_size: u32, gap_percentage: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size as usize),
            window_size: window_size as usize,
            gap_percentage,
            last_median: f64::INFINITY,
        }
    }

    /// Feeds the energy of a pass, returning true if the relaxation should
    /// stop
    pub(crate) fn observe(&mut self, energy: f64) -> bool {
        self.window.push_back(energy);
        if self.window.len() < self.window_size {
            return false;
        }

        let median = upper_median(&self.window);

        // no band exists until a first median was computed
        let converged = self.last_median.is_finite() && {
            let gap = self.gap_percentage * self.last_median;
            self.last_median - gap <= energy && energy <= self.last_median + gap
        };

        self.last_median = median;
        self.window.pop_front();

        converged
    }
}

/// The `ceil(n / 2)`-th smallest value, only partially ordering a copy of the
/// window
fn upper_median(window: &VecDeque<f64>) -> f64 {
    let mut sorted: Vec<f64> = window.iter().copied().collect();
    let index = (sorted.len() + 1) / 2 - 1;

    let (_, median, _) = sorted.select_nth_unstable_by(index, |a, b| a.total_cmp(b));
    *median
}
