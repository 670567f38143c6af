//! Outbound rate limiting: a per-run send budget bounded by the daily cap.

/// The number of sends still permitted in the current run.
///
/// One unit is consumed per successfully *attempted* send — dry-run attempts
/// count the same as real ones, so repeated dry runs model real capacity.
/// Failed sends do not consume budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBudget {
    allowed: u32,
    consumed: u32,
}

impl RunBudget {
    /// Computes the budget for this run, or `None` when the daily limit is
    /// already exhausted (the caller must abort with a zero-action summary).
    pub fn compute(max_per_day: u32, max_per_run: u32, sent_today: u32) -> Option<Self> {
        let remaining_today = max_per_day.saturating_sub(sent_today);
        if remaining_today == 0 {
            return None;
        }
        Some(Self {
            allowed: remaining_today.min(max_per_run),
            consumed: 0,
        })
    }

    pub fn allowed(&self) -> u32 {
        self.allowed
    }

    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.allowed
    }

    pub fn consume(&mut self) {
        self.consumed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_limit_exhausted_yields_none() {
        assert!(RunBudget::compute(5, 10, 5).is_none());
        assert!(RunBudget::compute(5, 10, 7).is_none());
    }

    #[test]
    fn test_budget_is_min_of_run_cap_and_daily_remainder() {
        // max_per_day=5, 3 already sent, max_per_run=10 -> at most 2 more.
        let budget = RunBudget::compute(5, 10, 3).unwrap();
        assert_eq!(budget.allowed(), 2);

        let budget = RunBudget::compute(30, 10, 3).unwrap();
        assert_eq!(budget.allowed(), 10);
    }

    #[test]
    fn test_consume_until_exhausted() {
        let mut budget = RunBudget::compute(5, 10, 3).unwrap();
        assert!(!budget.is_exhausted());
        budget.consume();
        assert!(!budget.is_exhausted());
        budget.consume();
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_zero_sent_today_uses_full_run_cap() {
        let budget = RunBudget::compute(30, 10, 0).unwrap();
        assert_eq!(budget.allowed(), 10);
    }
}
