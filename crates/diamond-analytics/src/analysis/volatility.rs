//! Ranking of grade values by price dispersion within narrow carat bins.
//!
//! For each (carat bin, value) pair the coefficient of variation of price is
//! computed. Within a bin the `top_k` most volatile values are kept, and the
//! ranking counts how many bins each value made it into.

use super::binning::{CaratBins, PeerGroupBucketizer};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::grades::{CategoricalAttribute, GradeValue, TargetProfile};
use crate::types::{BinVolatility, VolatilityEntry};
use crate::utils::{mean, sample_std};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct VolatilityRanker {
    bins: CaratBins,
    min_group_size: usize,
    top_k: usize,
    ranking_limit: usize,
    profile: TargetProfile,
}

impl Default for VolatilityRanker {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl VolatilityRanker {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            bins: CaratBins::new(config.min_carat, config.max_carat, config.volatility_bin_width),
            min_group_size: config.min_group_size,
            top_k: config.volatility_top_k,
            ranking_limit: config.ranking_limit,
            profile: config.target_profile.clone(),
        }
    }

    /// Price dispersion per (carat bin, value), ordered by bin then value.
    ///
    /// Pairs below the minimum group size, or whose variation is undefined,
    /// are left out.
    pub fn bin_volatility(
        &self,
        dataset: &Dataset,
        attribute: CategoricalAttribute,
    ) -> Vec<BinVolatility> {
        let bucketizer = PeerGroupBucketizer::new(self.bins, &[attribute], self.min_group_size);

        bucketizer
            .groups(dataset)
            .into_iter()
            .filter_map(|group| {
                let prices = group.prices();
                let mean_price = mean(&prices)?;
                let std_price = sample_std(&prices)?;
                let variation = std_price / mean_price;
                if !variation.is_finite() {
                    return None;
                }
                let value = group.key.into_iter().next()?;
                Some(BinVolatility {
                    carat_bin: group.carat_bin,
                    value,
                    samples: prices.len(),
                    mean_price,
                    std_price,
                    min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                    max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    variation,
                })
            })
            .collect()
    }

    /// Values most often among the `top_k` most volatile in a carat bin.
    ///
    /// Ordered by descending frequency, ties by grade order, and capped at
    /// `ranking_limit`. Empty input yields an empty ranking.
    pub fn rank(&self, dataset: &Dataset, attribute: CategoricalAttribute) -> Vec<VolatilityEntry> {
        let table = self.bin_volatility(dataset, attribute);

        let mut per_bin: BTreeMap<u32, Vec<&BinVolatility>> = BTreeMap::new();
        for row in &table {
            per_bin.entry(row.carat_bin.index).or_default().push(row);
        }

        let mut frequency: BTreeMap<&GradeValue, usize> = BTreeMap::new();
        for rows in per_bin.values_mut() {
            rows.sort_by(|a, b| {
                b.variation
                    .total_cmp(&a.variation)
                    .then_with(|| a.value.cmp(&b.value))
            });
            for row in rows.iter().take(self.top_k) {
                *frequency.entry(&row.value).or_default() += 1;
            }
        }
        debug!(
            "{}: {} scored pairs across {} bins",
            attribute,
            table.len(),
            per_bin.len()
        );

        // BTreeMap iteration is in grade order, so the stable sort keeps
        // grade order among equal counts.
        let mut counted: Vec<(&GradeValue, usize)> = frequency.into_iter().collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1));
        counted.truncate(self.ranking_limit);

        let entries: Vec<VolatilityEntry> = counted
            .into_iter()
            .map(|(value, frequency)| VolatilityEntry {
                attribute,
                value: value.clone(),
                frequency,
                in_target_profile: self.profile.contains(value),
            })
            .collect();

        info!(
            "Volatility ranking for {}: {}",
            attribute,
            entries
                .iter()
                .map(|e| format!("{} ({})", e.value, e.frequency))
                .collect::<Vec<_>>()
                .join(", ")
        );
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DiamondRecord;
    use crate::dataset::test_support::stone;
    use crate::grades::{Color, Graded};
    use pretty_assertions::assert_eq;

    /// Ten stones of one color and weight with prices `1000 + spread·i`.
    fn spread_group(first_id: u64, color: Color, carat: f64, spread: f64) -> Vec<DiamondRecord> {
        (0..10u64)
            .map(|i| {
                let mut record = stone(first_id + i, 1000.0 + spread * i as f64);
                record.color = Graded::Known(color);
                record.carat = carat;
                record
            })
            .collect()
    }

    fn two_bins() -> Dataset {
        let mut records = Vec::new();
        records.extend(spread_group(100, Color::D, 0.5, 100.0));
        records.extend(spread_group(200, Color::E, 0.5, 20.0));
        records.extend(spread_group(300, Color::F, 0.5, 50.0));
        records.extend(spread_group(400, Color::G, 0.5, 1.0));
        records.extend(spread_group(500, Color::D, 0.6, 100.0));
        records.extend(spread_group(600, Color::G, 0.6, 50.0));
        records.extend(spread_group(700, Color::H, 0.6, 20.0));
        records.extend(spread_group(800, Color::E, 0.6, 1.0));
        Dataset::new(records)
    }

    fn labels(entries: &[VolatilityEntry]) -> Vec<(String, usize)> {
        entries
            .iter()
            .map(|e| (e.value.label().to_string(), e.frequency))
            .collect()
    }

    #[test]
    fn test_rank_counts_top_k_per_bin() {
        let entries = VolatilityRanker::default().rank(&two_bins(), CategoricalAttribute::Color);
        assert_eq!(
            labels(&entries),
            vec![("D".to_string(), 2), ("E".to_string(), 1), ("F".to_string(), 1)]
        );
        assert!(entries[0].in_target_profile);
        assert_eq!(entries[0].attribute, CategoricalAttribute::Color);
    }

    #[test]
    fn test_bin_volatility_table() {
        let table = VolatilityRanker::default().bin_volatility(&two_bins(), CategoricalAttribute::Color);
        assert_eq!(table.len(), 8);

        let first = &table[0];
        assert_eq!(first.carat_bin.index, 39);
        assert_eq!(first.value.label(), "D");
        assert_eq!(first.samples, 10);
        assert_eq!(first.mean_price, 1450.0);
        assert_eq!(first.min_price, 1000.0);
        assert_eq!(first.max_price, 1900.0);
        assert!((first.variation - first.std_price / 1450.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_groups_never_rank() {
        let mut records = spread_group(1, Color::D, 0.5, 100.0);
        records.truncate(9);
        records.extend(spread_group(100, Color::E, 0.5, 10.0));

        let entries = VolatilityRanker::default().rank(&Dataset::new(records), CategoricalAttribute::Color);
        assert_eq!(labels(&entries), vec![("E".to_string(), 1)]);
    }

    #[test]
    fn test_single_member_pairs_are_dropped() {
        let config = PipelineConfig::builder().min_group_size(1).build().unwrap();
        let ranker = VolatilityRanker::from_config(&config);

        let mut records = spread_group(1, Color::D, 0.5, 100.0);
        let mut lone_h = stone(50, 4000.0);
        lone_h.color = Graded::Known(Color::H);
        let mut lone_g = stone(60, 2500.0);
        lone_g.color = Graded::Known(Color::G);
        lone_g.carat = 0.6;
        records.push(lone_h);
        records.push(lone_g);
        let dataset = Dataset::new(records);

        let table = ranker.bin_volatility(&dataset, CategoricalAttribute::Color);
        let values: Vec<&str> = table.iter().map(|row| row.value.label()).collect();
        assert_eq!(values, vec!["D"]);
        assert!(table.iter().all(|row| row.variation.is_finite()));

        let entries = ranker.rank(&dataset, CategoricalAttribute::Color);
        assert_eq!(labels(&entries), vec![("D".to_string(), 1)]);
    }

    #[test]
    fn test_empty_dataset_yields_empty_ranking() {
        for attribute in CategoricalAttribute::ALL {
            assert!(VolatilityRanker::default().rank(&Dataset::default(), attribute).is_empty());
        }
    }

    #[test]
    fn test_single_value_dataset() {
        let dataset = Dataset::new(spread_group(1, Color::J, 0.5, 10.0));
        let entries = VolatilityRanker::default().rank(&dataset, CategoricalAttribute::Color);
        assert_eq!(labels(&entries), vec![("J".to_string(), 1)]);
        assert!(!entries[0].in_target_profile);
    }
}
