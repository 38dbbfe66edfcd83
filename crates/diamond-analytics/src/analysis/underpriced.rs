//! Detection of stones priced below their peer-group median.

use super::binning::{CaratBins, PeerGroupBucketizer};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::grades::{CategoricalAttribute, TargetProfile};
use crate::types::UnderpricedCandidate;
use crate::utils::{median, round_to};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Candidates together with the number of peer groups that were large
/// enough to be analysed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub candidates: Vec<UnderpricedCandidate>,
    pub qualifying_groups: usize,
}

/// Flags every stone strictly cheaper than the median of its peer group.
#[derive(Debug, Clone)]
pub struct UnderpricedDetector {
    bins: CaratBins,
    min_group_size: usize,
    profile: TargetProfile,
}

impl Default for UnderpricedDetector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl UnderpricedDetector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            bins: CaratBins::new(config.min_carat, config.max_carat, config.detector_bin_width),
            min_group_size: config.min_group_size,
            profile: config.target_profile.clone(),
        }
    }

    /// Find underpriced stones, grouping by carat bin plus `group_by`.
    ///
    /// Results are ordered by descending `deviation_amount`, ties by
    /// ascending id. An empty dataset, or one where no group reaches the
    /// minimum size, yields an empty vector.
    pub fn detect(
        &self,
        dataset: &Dataset,
        group_by: &[CategoricalAttribute],
    ) -> Vec<UnderpricedCandidate> {
        self.detect_with_groups(dataset, group_by).candidates
    }

    /// Like [`detect`](Self::detect), also reporting how many peer groups
    /// reached the minimum size. Zero qualifying groups and qualifying
    /// groups without a stone below the median are different outcomes.
    pub fn detect_with_groups(
        &self,
        dataset: &Dataset,
        group_by: &[CategoricalAttribute],
    ) -> Detection {
        let bucketizer = PeerGroupBucketizer::new(self.bins, group_by, self.min_group_size);
        let groups = bucketizer.groups(dataset);

        let mut candidates = Vec::new();
        for group in &groups {
            let Some(peer_median) = median(&group.prices()) else {
                continue;
            };
            let group_key = group.key_label();

            let before = candidates.len();
            for record in group.members.iter().filter(|r| r.price < peer_median) {
                let gap = peer_median - record.price;
                candidates.push(UnderpricedCandidate {
                    record: (*record).clone(),
                    group_key: group_key.clone(),
                    carat_bin: group.carat_bin,
                    peer_median_price: peer_median,
                    deviation_amount: round_to(gap, 2),
                    deviation_percent: round_to(gap / peer_median * 100.0, 1),
                    peer_group_size: group.len(),
                    in_target_profile: self.profile.matches(record),
                });
            }
            debug!(
                "Group {} {}: median {:.2}, {} below",
                group.carat_bin,
                group_key,
                peer_median,
                candidates.len() - before
            );
        }

        candidates.sort_by(compare_candidates);
        info!(
            "Found {} underpriced stones in {} peer groups",
            candidates.len(),
            groups.len()
        );
        Detection {
            candidates,
            qualifying_groups: groups.len(),
        }
    }
}

/// Largest deviation first, then lowest id.
fn compare_candidates(a: &UnderpricedCandidate, b: &UnderpricedCandidate) -> Ordering {
    b.deviation_amount
        .total_cmp(&a.deviation_amount)
        .then_with(|| a.record.id.cmp(&b.record.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DiamondRecord;
    use crate::dataset::test_support::stone;
    use crate::grades::{Clarity, Color, Cut, Graded};
    use pretty_assertions::assert_eq;

    const ALL_GRADES: [CategoricalAttribute; 3] = [
        CategoricalAttribute::Cut,
        CategoricalAttribute::Color,
        CategoricalAttribute::Clarity,
    ];

    fn twelve_stones() -> Dataset {
        (0..12u64)
            .map(|i| stone(i + 1, 1000.0 + 100.0 * i as f64))
            .collect()
    }

    #[test]
    fn test_twelve_stone_group() {
        let candidates = UnderpricedDetector::default().detect(&twelve_stones(), &ALL_GRADES);

        assert_eq!(candidates.len(), 6);
        let prices: Vec<f64> = candidates.iter().map(|c| c.record.price).collect();
        assert_eq!(prices, vec![1000.0, 1100.0, 1200.0, 1300.0, 1400.0, 1500.0]);

        let first = &candidates[0];
        assert_eq!(first.peer_median_price, 1550.0);
        assert_eq!(first.deviation_amount, 550.0);
        assert_eq!(first.deviation_percent, 35.5);
        assert_eq!(first.peer_group_size, 12);
        assert_eq!(first.group_key, "Ideal,E,SI1");
        assert_eq!(first.carat_bin.index, 3);
        for candidate in &candidates {
            assert!(candidate.record.price < candidate.peer_median_price);
            assert_eq!(
                candidate.deviation_amount,
                round_to(candidate.peer_median_price - candidate.record.price, 2)
            );
        }
    }

    #[test]
    fn test_group_key_follows_group_by_order() {
        let candidates = UnderpricedDetector::default().detect(
            &twelve_stones(),
            &[CategoricalAttribute::Clarity, CategoricalAttribute::Color],
        );
        assert_eq!(candidates[0].group_key, "SI1,E");
    }

    #[test]
    fn test_minimum_group_size_boundary() {
        let nine: Dataset = (1..=9).map(|i| stone(i, 1000.0 + i as f64)).collect();
        assert!(UnderpricedDetector::default().detect(&nine, &ALL_GRADES).is_empty());

        let ten: Dataset = (1..=10).map(|i| stone(i, 1000.0 + i as f64)).collect();
        assert_eq!(UnderpricedDetector::default().detect(&ten, &ALL_GRADES).len(), 5);
    }

    #[test]
    fn test_equal_prices_qualify_without_candidates() {
        let flat: Dataset = (1..=12).map(|i| stone(i, 1000.0)).collect();
        let detection = UnderpricedDetector::default().detect_with_groups(&flat, &ALL_GRADES);
        assert!(detection.candidates.is_empty());
        assert_eq!(detection.qualifying_groups, 1);

        let nine: Dataset = (1..=9).map(|i| stone(i, 1000.0 + i as f64)).collect();
        let detection = UnderpricedDetector::default().detect_with_groups(&nine, &ALL_GRADES);
        assert_eq!(detection.qualifying_groups, 0);
    }

    #[test]
    fn test_ties_are_broken_by_id() {
        let mut records: Vec<DiamondRecord> = (1..=10).map(|i| stone(i, 2000.0)).collect();
        records[7].price = 1000.0;
        records[2].price = 1000.0;
        let candidates = UnderpricedDetector::default().detect(&Dataset::new(records), &ALL_GRADES);

        let ids: Vec<u64> = candidates.iter().map(|c| c.record.id).collect();
        assert_eq!(ids, vec![3, 8]);
    }

    #[test]
    fn test_target_profile_flag() {
        let mut records: Vec<DiamondRecord> = (1..=10).map(|i| stone(i, 1000.0 * i as f64)).collect();
        for record in &mut records {
            record.cut = Graded::Known(Cut::Ideal);
            record.color = Graded::Known(Color::D);
            record.clarity = Graded::Known(Clarity::If);
        }
        let candidates = UnderpricedDetector::default().detect(&Dataset::new(records), &ALL_GRADES);
        assert!(candidates.iter().all(|c| c.in_target_profile));

        let other = UnderpricedDetector::default().detect(&twelve_stones(), &ALL_GRADES);
        assert!(other.iter().all(|c| !c.in_target_profile));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(UnderpricedDetector::default()
            .detect(&Dataset::default(), &ALL_GRADES)
            .is_empty());
    }
}
