//! Typed records and the immutable dataset passed between stages.

use crate::grades::{AttributeSelection, Clarity, Color, Cut, Graded};
use crate::utils::round_to;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One stone, as read from a single input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondRecord {
    pub id: u64,
    pub cut: Graded<Cut>,
    pub color: Graded<Color>,
    pub clarity: Graded<Clarity>,
    pub price: f64,
    pub carat: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Declared depth percentage.
    pub depth: f64,
}

impl DiamondRecord {
    /// Depth percentage computed from the physical dimensions:
    /// `z / ((x + y) / 2) * 100`.
    pub fn depth_calc(&self) -> f64 {
        self.z / ((self.x + self.y) / 2.0) * 100.0
    }

    /// Absolute gap between declared and computed depth, in percentage points.
    pub fn depth_diff(&self) -> f64 {
        (self.depth_calc() - self.depth).abs()
    }

    pub fn has_known_grades(&self) -> bool {
        self.cut.is_known() && self.color.is_known() && self.clarity.is_known()
    }
}

/// An ordered collection of records sharing the diamond schema.
///
/// A dataset is never mutated; every stage consumes one and returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<DiamondRecord>,
}

impl Dataset {
    pub fn new(records: Vec<DiamondRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DiamondRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiamondRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<DiamondRecord> {
        self.records
    }

    /// Keep the records matching `predicate`, preserving order.
    pub fn retain(self, predicate: impl FnMut(&DiamondRecord) -> bool) -> Self {
        let mut records = self.records;
        records.retain(predicate);
        Self { records }
    }

    /// Restrict to the records allowed by an attribute selection.
    pub fn select(&self, selection: &AttributeSelection) -> Self {
        if selection.is_unrestricted() {
            return self.clone();
        }
        Self::new(
            self.records
                .iter()
                .filter(|record| selection.matches(record))
                .cloned()
                .collect(),
        )
    }

    /// Convert to a Polars frame, including the derived depth columns.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let ids: Vec<u64> = self.records.iter().map(|r| r.id).collect();
        let cuts: Vec<String> = self.records.iter().map(|r| r.cut.to_string()).collect();
        let colors: Vec<String> = self.records.iter().map(|r| r.color.to_string()).collect();
        let clarities: Vec<String> = self
            .records
            .iter()
            .map(|r| r.clarity.to_string())
            .collect();
        let prices: Vec<f64> = self.records.iter().map(|r| r.price).collect();
        let carats: Vec<f64> = self.records.iter().map(|r| r.carat).collect();
        let xs: Vec<f64> = self.records.iter().map(|r| r.x).collect();
        let ys: Vec<f64> = self.records.iter().map(|r| r.y).collect();
        let zs: Vec<f64> = self.records.iter().map(|r| r.z).collect();
        let depths: Vec<f64> = self.records.iter().map(|r| r.depth).collect();
        let depth_calcs: Vec<f64> = self
            .records
            .iter()
            .map(|r| round_to(r.depth_calc(), 4))
            .collect();
        let depth_diffs: Vec<f64> = self
            .records
            .iter()
            .map(|r| round_to(r.depth_diff(), 4))
            .collect();

        df!(
            "id" => ids,
            "cut" => cuts,
            "color" => colors,
            "clarity" => clarities,
            "price" => prices,
            "carat" => carats,
            "x" => xs,
            "y" => ys,
            "z" => zs,
            "depth" => depths,
            "depth_calc" => depth_calcs,
            "depth_diff" => depth_diffs
        )
    }
}

impl FromIterator<DiamondRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = DiamondRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DiamondRecord;
    type IntoIter = std::slice::Iter<'a, DiamondRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
