//! Ordinal grading scales for cut, color and clarity.
//!
//! Each scale is a closed enumeration whose declaration order is its
//! natural order: `Cut` runs worst to best (Fair → Ideal), `Color` and
//! `Clarity` run best to worst (D → Z, FL → I3). That order is what breaks
//! ties wherever grades are ranked.
//!
//! Raw table values are held as [`Graded<T>`] so that a value outside the
//! scale survives ingestion and can be removed (or kept) explicitly by the
//! category normalizer.

use crate::dataset::DiamondRecord;
use crate::error::PipelineError;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A closed, ordered grading scale.
pub trait Grade: Copy + Ord + fmt::Debug + 'static {
    /// Attribute this scale belongs to.
    const ATTRIBUTE: CategoricalAttribute;

    /// Every grade, in natural order.
    const ALL: &'static [Self];

    /// Canonical label as it appears in the data.
    fn label(self) -> &'static str;

    /// Parse a label, ignoring case and surrounding whitespace.
    fn from_label(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|grade| grade.label().eq_ignore_ascii_case(trimmed))
    }
}

/// Parse a grade label, reporting the attribute on failure.
fn parse_grade<T: Grade>(raw: &str) -> Result<T, PipelineError> {
    T::from_label(raw).ok_or_else(|| PipelineError::UnknownGrade {
        attribute: T::ATTRIBUTE.name().to_string(),
        value: raw.trim().to_string(),
    })
}

/// Cut quality, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cut {
    Fair,
    Good,
    VeryGood,
    Premium,
    Ideal,
}

impl Grade for Cut {
    const ATTRIBUTE: CategoricalAttribute = CategoricalAttribute::Cut;
    const ALL: &'static [Self] = &[
        Self::Fair,
        Self::Good,
        Self::VeryGood,
        Self::Premium,
        Self::Ideal,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::VeryGood => "Very Good",
            Self::Premium => "Premium",
            Self::Ideal => "Ideal",
        }
    }
}

/// Body color, colorless (D) to light yellow (Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
}

impl Grade for Color {
    const ATTRIBUTE: CategoricalAttribute = CategoricalAttribute::Color;
    const ALL: &'static [Self] = &[
        Self::D, Self::E, Self::F, Self::G, Self::H, Self::I, Self::J, Self::K,
        Self::L, Self::M, Self::N, Self::O, Self::P, Self::Q, Self::R, Self::S,
        Self::T, Self::U, Self::V, Self::W, Self::X, Self::Y, Self::Z,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
            Self::H => "H",
            Self::I => "I",
            Self::J => "J",
            Self::K => "K",
            Self::L => "L",
            Self::M => "M",
            Self::N => "N",
            Self::O => "O",
            Self::P => "P",
            Self::Q => "Q",
            Self::R => "R",
            Self::S => "S",
            Self::T => "T",
            Self::U => "U",
            Self::V => "V",
            Self::W => "W",
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }
}

/// Clarity, flawless to heavily included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Clarity {
    Fl,
    If,
    Vvs1,
    Vvs2,
    Vs1,
    Vs2,
    Si1,
    Si2,
    Si3,
    I1,
    I2,
    I3,
}

impl Grade for Clarity {
    const ATTRIBUTE: CategoricalAttribute = CategoricalAttribute::Clarity;
    const ALL: &'static [Self] = &[
        Self::Fl,
        Self::If,
        Self::Vvs1,
        Self::Vvs2,
        Self::Vs1,
        Self::Vs2,
        Self::Si1,
        Self::Si2,
        Self::Si3,
        Self::I1,
        Self::I2,
        Self::I3,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Fl => "FL",
            Self::If => "IF",
            Self::Vvs1 => "VVS1",
            Self::Vvs2 => "VVS2",
            Self::Vs1 => "VS1",
            Self::Vs2 => "VS2",
            Self::Si1 => "SI1",
            Self::Si2 => "SI2",
            Self::Si3 => "SI3",
            Self::I1 => "I1",
            Self::I2 => "I2",
            Self::I3 => "I3",
        }
    }
}

/// Label-based `Display`, `FromStr` and serde impls shared by every scale.
macro_rules! label_traits {
    ($($scale:ty),+) => {$(
        impl fmt::Display for $scale {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $scale {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_grade(s)
            }
        }

        impl Serialize for $scale {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $scale {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    )+};
}

label_traits!(Cut, Color, Clarity);

/// A categorical cell: either a grade on its scale or the raw text.
///
/// Known grades sort before unlisted text; unlisted values sort by text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Graded<T> {
    Known(T),
    Unlisted(String),
}

impl<T: Grade> Graded<T> {
    /// Interpret a raw cell value.
    pub fn parse(raw: &str) -> Self {
        match T::from_label(raw) {
            Some(grade) => Graded::Known(grade),
            None => Graded::Unlisted(raw.trim().to_string()),
        }
    }

    pub fn known(&self) -> Option<T> {
        match self {
            Graded::Known(grade) => Some(*grade),
            Graded::Unlisted(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Graded::Known(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Graded::Known(grade) => grade.label(),
            Graded::Unlisted(raw) => raw,
        }
    }
}

impl<T: Grade> From<T> for Graded<T> {
    fn from(grade: T) -> Self {
        Graded::Known(grade)
    }
}

impl<T: Grade> fmt::Display for Graded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<T: Grade> Serialize for Graded<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de, T: Grade> Deserialize<'de> for Graded<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Graded::parse(&raw))
    }
}

/// The categorical attributes a record can be grouped or ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalAttribute {
    Cut,
    Color,
    Clarity,
}

impl CategoricalAttribute {
    pub const ALL: [CategoricalAttribute; 3] = [Self::Cut, Self::Color, Self::Clarity];

    /// Column name in the input table.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Color => "color",
            Self::Clarity => "clarity",
        }
    }

    /// The record's value for this attribute.
    pub fn value_of(self, record: &DiamondRecord) -> GradeValue {
        match self {
            Self::Cut => GradeValue::Cut(record.cut.clone()),
            Self::Color => GradeValue::Color(record.color.clone()),
            Self::Clarity => GradeValue::Clarity(record.clarity.clone()),
        }
    }
}

impl fmt::Display for CategoricalAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CategoricalAttribute {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|attribute| attribute.name() == normalized)
            .ok_or_else(|| PipelineError::UnknownAttribute(s.trim().to_string()))
    }
}

/// A value of any categorical attribute, ordered by attribute then grade.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeValue {
    Cut(Graded<Cut>),
    Color(Graded<Color>),
    Clarity(Graded<Clarity>),
}

impl GradeValue {
    pub fn attribute(&self) -> CategoricalAttribute {
        match self {
            Self::Cut(_) => CategoricalAttribute::Cut,
            Self::Color(_) => CategoricalAttribute::Color,
            Self::Clarity(_) => CategoricalAttribute::Clarity,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Cut(value) => value.label(),
            Self::Color(value) => value.label(),
            Self::Clarity(value) => value.label(),
        }
    }
}

impl fmt::Display for GradeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GradeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Grades demanded by the target clientele.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfile {
    pub colors: Vec<Color>,
    pub clarities: Vec<Clarity>,
    pub cuts: Vec<Cut>,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            colors: vec![Color::D, Color::E, Color::F],
            clarities: vec![Clarity::If, Clarity::Vvs1, Clarity::Vvs2],
            cuts: vec![Cut::Ideal, Cut::Premium, Cut::VeryGood],
        }
    }
}

impl TargetProfile {
    /// Whether a single attribute value is part of the profile.
    pub fn contains(&self, value: &GradeValue) -> bool {
        match value {
            GradeValue::Cut(graded) => graded.known().is_some_and(|g| self.cuts.contains(&g)),
            GradeValue::Color(graded) => graded.known().is_some_and(|g| self.colors.contains(&g)),
            GradeValue::Clarity(graded) => {
                graded.known().is_some_and(|g| self.clarities.contains(&g))
            }
        }
    }

    /// Whether every grade of the record is part of the profile.
    pub fn matches(&self, record: &DiamondRecord) -> bool {
        CategoricalAttribute::ALL
            .into_iter()
            .all(|attribute| self.contains(&attribute.value_of(record)))
    }
}

/// Optional allow-lists applied before detection.
///
/// `None` leaves an attribute unrestricted. A restricted attribute never
/// matches an unlisted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSelection {
    pub cuts: Option<Vec<Cut>>,
    pub colors: Option<Vec<Color>>,
    pub clarities: Option<Vec<Clarity>>,
}

impl AttributeSelection {
    pub fn is_unrestricted(&self) -> bool {
        self.cuts.is_none() && self.colors.is_none() && self.clarities.is_none()
    }

    pub fn matches(&self, record: &DiamondRecord) -> bool {
        allowed(&self.cuts, &record.cut)
            && allowed(&self.colors, &record.color)
            && allowed(&self.clarities, &record.clarity)
    }
}

fn allowed<T: Grade>(list: &Option<Vec<T>>, value: &Graded<T>) -> bool {
    match list {
        None => true,
        Some(grades) => value.known().is_some_and(|grade| grades.contains(&grade)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        assert!(Cut::Fair < Cut::Good);
        assert!(Cut::Premium < Cut::Ideal);
        assert!(Color::D < Color::Z);
        assert!(Clarity::Fl < Clarity::I3);
        assert!(Clarity::Vvs2 < Clarity::Vs1);
    }

    #[test]
    fn test_scale_sizes() {
        assert_eq!(Cut::ALL.len(), 5);
        assert_eq!(Color::ALL.len(), 23);
        assert_eq!(Clarity::ALL.len(), 12);
    }

    #[test]
    fn test_parse_is_lenient_about_case_and_whitespace() {
        assert_eq!(Cut::from_label(" very good "), Some(Cut::VeryGood));
        assert_eq!(Clarity::from_label("vvs1"), Some(Clarity::Vvs1));
        assert_eq!(Color::from_label("e"), Some(Color::E));
        assert_eq!(Color::from_label("AA"), None);
    }

    #[test]
    fn test_from_str_error_names_attribute() {
        let err = "Superb".parse::<Cut>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_GRADE");
        assert!(err.to_string().contains("cut"));
    }

    #[test]
    fn test_graded_ordering_puts_unlisted_last() {
        let known: Graded<Color> = Graded::parse("Z");
        let unlisted: Graded<Color> = Graded::parse("purple");
        assert!(known < unlisted);
        assert!(!unlisted.is_known());
        assert_eq!(unlisted.label(), "purple");
    }

    #[test]
    fn test_attribute_from_str() {
        assert_eq!(
            "Color".parse::<CategoricalAttribute>().unwrap(),
            CategoricalAttribute::Color
        );
        let err = "table".parse::<CategoricalAttribute>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_ATTRIBUTE");
    }

    #[test]
    fn test_every_scale_uses_its_labels() {
        assert_eq!(Cut::VeryGood.to_string(), "Very Good");
        assert_eq!(serde_json::to_string(&Color::F).unwrap(), "\"F\"");
        let clarity: Clarity = serde_json::from_str("\"vvs2\"").unwrap();
        assert_eq!(clarity, Clarity::Vvs2);
        let err = "Q9".parse::<Clarity>().unwrap_err();
        assert!(err.to_string().contains("clarity"));
        assert!(serde_json::from_str::<Color>("\"purple\"").is_err());
    }

    #[test]
    fn test_graded_serializes_as_label() {
        let value: Graded<Cut> = Graded::Known(Cut::VeryGood);
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"Very Good\"");
        let parsed: Graded<Cut> = serde_json::from_str("\"ideal\"").unwrap();
        assert_eq!(parsed, Graded::Known(Cut::Ideal));
    }

    #[test]
    fn test_target_profile_contains() {
        let profile = TargetProfile::default();
        assert!(profile.contains(&GradeValue::Color(Graded::Known(Color::E))));
        assert!(!profile.contains(&GradeValue::Color(Graded::Known(Color::H))));
        assert!(!profile.contains(&GradeValue::Cut(Graded::Unlisted("Ideal-ish".into()))));
    }
}
