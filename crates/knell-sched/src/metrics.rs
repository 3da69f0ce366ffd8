//! Kernel counters.

/// Cumulative counters for one kernel instance.
///
/// Snapshot via [`Kernel::metrics()`](crate::Kernel::metrics); all
/// counters start at zero and only ever increase (except
/// `high_water_pending`, which tracks the maximum queue depth seen).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KernelMetrics {
    /// Records accepted by `post`.
    pub posted: u64,
    /// Records delivered to a live target.
    pub dispatched: u64,
    /// Records that reached their due time after their target died.
    pub discarded_dead: u64,
    /// Records removed by `cancel` / `cancel_all_for`.
    pub canceled: u64,
    /// Maximum number of simultaneously pending records.
    pub high_water_pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = KernelMetrics::default();
        assert_eq!(m.posted, 0);
        assert_eq!(m.high_water_pending, 0);
    }
}
