//! Carat bins and peer groups.
//!
//! Bins are left-open, right-closed intervals `(origin + k·w, origin + (k+1)·w]`
//! identified by their integer index `k`, so membership never depends on
//! accumulated floating-point edges. The last bin is clipped at the upper
//! bound of the analysed range.

use crate::dataset::{Dataset, DiamondRecord};
use crate::grades::{CategoricalAttribute, GradeValue};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Decimal places kept when snapping scaled carat values and bin edges.
const SNAP_DECIMALS: i32 = 9;

/// One carat interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaratBin {
    pub index: u32,
    /// Exclusive lower edge.
    pub lower: f64,
    /// Inclusive upper edge.
    pub upper: f64,
}

impl CaratBin {
    pub fn contains(&self, carat: f64) -> bool {
        carat > self.lower && carat <= self.upper
    }
}

impl fmt::Display for CaratBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lower, self.upper)
    }
}

/// Fixed-width binning of the carat range `(origin, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaratBins {
    origin: f64,
    upper: f64,
    width: f64,
    count: u32,
}

impl CaratBins {
    /// Expects `width > 0` and `origin < upper`; the config validates both.
    pub fn new(origin: f64, upper: f64, width: f64) -> Self {
        let count = round_to((upper - origin) / width, SNAP_DECIMALS).ceil().max(0.0) as u32;
        Self {
            origin,
            upper,
            width,
            count,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Index of the bin holding `carat`, or `None` outside `(origin, upper]`.
    pub fn index_of(&self, carat: f64) -> Option<u32> {
        if !(carat > self.origin && carat <= self.upper) {
            return None;
        }
        let scaled = round_to((carat - self.origin) / self.width, SNAP_DECIMALS);
        let index = scaled.ceil() as i64 - 1;
        if index < 0 || self.count == 0 {
            return None;
        }
        Some((index as u32).min(self.count - 1))
    }

    pub fn bin(&self, index: u32) -> CaratBin {
        let lower = self.origin + f64::from(index) * self.width;
        let upper = (lower + self.width).min(self.upper);
        CaratBin {
            index,
            lower: round_to(lower, SNAP_DECIMALS),
            upper: round_to(upper, SNAP_DECIMALS),
        }
    }

    pub fn bin_of(&self, carat: f64) -> Option<CaratBin> {
        self.index_of(carat).map(|index| self.bin(index))
    }
}

/// Records sharing a carat bin and a tuple of grade values.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerGroup<'a> {
    pub carat_bin: CaratBin,
    /// One value per grouping attribute, in grouping order.
    pub key: Vec<GradeValue>,
    pub members: Vec<&'a DiamondRecord>,
}

impl PeerGroup<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Grade labels joined with commas, e.g. `E,SI1,Ideal`.
    pub fn key_label(&self) -> String {
        self.key
            .iter()
            .map(GradeValue::label)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn prices(&self) -> Vec<f64> {
        self.members.iter().map(|record| record.price).collect()
    }
}

/// Partitions a dataset into peer groups.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerGroupBucketizer {
    bins: CaratBins,
    attributes: Vec<CategoricalAttribute>,
    min_group_size: usize,
}

impl PeerGroupBucketizer {
    /// Repeated attributes are kept only at their first position.
    pub fn new(bins: CaratBins, attributes: &[CategoricalAttribute], min_group_size: usize) -> Self {
        let mut unique = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            if !unique.contains(attribute) {
                unique.push(*attribute);
            }
        }
        Self {
            bins,
            attributes: unique,
            min_group_size,
        }
    }

    pub fn attributes(&self) -> &[CategoricalAttribute] {
        &self.attributes
    }

    pub fn bins(&self) -> &CaratBins {
        &self.bins
    }

    /// Groups with at least `min_group_size` members, ordered by carat bin
    /// then grade tuple. Members keep dataset order.
    pub fn groups<'a>(&self, dataset: &'a Dataset) -> Vec<PeerGroup<'a>> {
        let mut buckets: BTreeMap<(u32, Vec<GradeValue>), Vec<&'a DiamondRecord>> =
            BTreeMap::new();

        for record in dataset {
            let Some(index) = self.bins.index_of(record.carat) else {
                continue;
            };
            let key = self
                .attributes
                .iter()
                .map(|attribute| attribute.value_of(record))
                .collect();
            buckets.entry((index, key)).or_default().push(record);
        }

        let total = buckets.len();
        let groups: Vec<PeerGroup<'a>> = buckets
            .into_iter()
            .filter(|(_, members)| members.len() >= self.min_group_size)
            .map(|((index, key), members)| PeerGroup {
                carat_bin: self.bins.bin(index),
                key,
                members,
            })
            .collect();

        debug!(
            "{} of {} peer groups reach {} members",
            groups.len(),
            total,
            self.min_group_size
        );
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::stone;
    use crate::grades::{Color, Graded};

    #[test]
    fn test_bin_count() {
        assert_eq!(CaratBins::new(0.1, 1.0, 0.1).len(), 9);
        assert_eq!(CaratBins::new(0.1, 1.0, 0.01).len(), 90);
        assert_eq!(CaratBins::new(0.1, 1.0, 0.4).len(), 3);
    }

    #[test]
    fn test_bins_are_right_closed() {
        let bins = CaratBins::new(0.1, 1.0, 0.1);
        assert_eq!(bins.index_of(0.1), None);
        assert_eq!(bins.index_of(0.15), Some(0));
        assert_eq!(bins.index_of(0.2), Some(0));
        assert_eq!(bins.index_of(0.21), Some(1));
        assert_eq!(bins.index_of(0.5), Some(3));
        assert_eq!(bins.index_of(0.3), Some(1));
        assert_eq!(bins.index_of(1.0), Some(8));
        assert_eq!(bins.index_of(1.01), None);
    }

    #[test]
    fn test_fine_bins_snap_edges() {
        let bins = CaratBins::new(0.1, 1.0, 0.01);
        assert_eq!(bins.index_of(0.11), Some(0));
        assert_eq!(bins.index_of(0.7), Some(59));
        assert_eq!(bins.index_of(0.71), Some(60));
        let bin = bins.bin(59);
        assert_eq!(bin.lower, 0.69);
        assert_eq!(bin.upper, 0.7);
        assert!(bin.contains(0.7));
    }

    #[test]
    fn test_last_bin_is_clipped() {
        let bins = CaratBins::new(0.1, 1.0, 0.4);
        let last = bins.bin_of(0.95).unwrap();
        assert_eq!(last.index, 2);
        assert_eq!(last.upper, 1.0);
        assert_eq!(last.to_string(), "(0.9, 1]");
    }

    #[test]
    fn test_groups_respect_minimum_size() {
        let mut records: Vec<DiamondRecord> = (1..=10).map(|i| stone(i, 1000.0)).collect();
        for i in 11..=19 {
            let mut record = stone(i, 1000.0);
            record.color = Graded::Known(Color::H);
            records.push(record);
        }
        let dataset = Dataset::new(records);
        let bucketizer = PeerGroupBucketizer::new(
            CaratBins::new(0.1, 1.0, 0.1),
            &[CategoricalAttribute::Color],
            10,
        );

        let groups = bucketizer.groups(&dataset);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 10);
        assert_eq!(groups[0].key_label(), "E");
        assert_eq!(groups[0].carat_bin.index, 3);
    }

    #[test]
    fn test_duplicate_attributes_are_ignored() {
        let bucketizer = PeerGroupBucketizer::new(
            CaratBins::new(0.1, 1.0, 0.1),
            &[
                CategoricalAttribute::Cut,
                CategoricalAttribute::Color,
                CategoricalAttribute::Cut,
            ],
            1,
        );
        assert_eq!(
            bucketizer.attributes(),
            &[CategoricalAttribute::Cut, CategoricalAttribute::Color]
        );

        let dataset = Dataset::new(vec![stone(1, 500.0)]);
        assert_eq!(bucketizer.groups(&dataset)[0].key_label(), "Ideal,E");
    }

    #[test]
    fn test_stones_outside_range_are_ignored() {
        let mut light = stone(1, 100.0);
        light.carat = 0.1;
        let mut heavy = stone(2, 9000.0);
        heavy.carat = 1.5;
        let dataset = Dataset::new(vec![light, heavy]);
        let bucketizer =
            PeerGroupBucketizer::new(CaratBins::new(0.1, 1.0, 0.1), &[CategoricalAttribute::Cut], 1);
        assert!(bucketizer.groups(&dataset).is_empty());
    }
}
