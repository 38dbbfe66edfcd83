//! Purchase and resale totals for a set of underpriced stones.

use crate::types::{InvestmentSummary, UnderpricedCandidate};
use crate::utils::round_to;

/// Totals over `candidates`, assuming each resells at its peer median or at
/// the median raised by `resale_markup` (0.10 = 10%).
pub fn summarize(candidates: &[UnderpricedCandidate], resale_markup: f64) -> InvestmentSummary {
    let total_investment: f64 = candidates.iter().map(|c| c.record.price).sum();
    let resale_at_median: f64 = candidates.iter().map(|c| c.peer_median_price).sum();
    let resale_at_markup = resale_at_median * (1.0 + resale_markup);

    InvestmentSummary {
        candidates: candidates.len(),
        total_investment: round_to(total_investment, 2),
        profit_at_median: round_to(resale_at_median - total_investment, 2),
        profit_at_markup: round_to(resale_at_markup - total_investment, 2),
        resale_markup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UnderpricedDetector;
    use crate::dataset::Dataset;
    use crate::dataset::test_support::stone;
    use crate::grades::CategoricalAttribute;

    #[test]
    fn test_summary_arithmetic() {
        let dataset: Dataset = (0..12u64)
            .map(|i| stone(i + 1, 1000.0 + 100.0 * i as f64))
            .collect();
        let candidates =
            UnderpricedDetector::default().detect(&dataset, &[CategoricalAttribute::Color]);

        let summary = summarize(&candidates, 0.10);
        assert_eq!(summary.candidates, 6);
        assert_eq!(summary.total_investment, 7500.0);
        assert_eq!(summary.profit_at_median, 1800.0);
        assert_eq!(summary.profit_at_markup, 2730.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], 0.10);
        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.total_investment, 0.0);
        assert_eq!(summary.profit_at_markup, 0.0);
    }
}
