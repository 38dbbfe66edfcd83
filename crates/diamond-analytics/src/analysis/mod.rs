//! Analytics over a clean dataset.
//!
//! Both analyses read the same immutable [`Dataset`](crate::dataset::Dataset)
//! and share no state:
//! - [`UnderpricedDetector`]: stones cheaper than their peer-group median
//! - [`VolatilityRanker`]: grade values with the most erratic pricing
//!
//! [`summarize`] totals the purchase cost and resale profit of a candidate list.

pub mod binning;
pub mod summary;
pub mod underpriced;
pub mod volatility;

pub use binning::{CaratBin, CaratBins, PeerGroup, PeerGroupBucketizer};
pub use summary::summarize;
pub use underpriced::{Detection, UnderpricedDetector};
pub use volatility::VolatilityRanker;
