//! Derived aggregate fields computed from dependent records.

use serde_json::{Number, Value};

use crate::models::{bootcamp, course, review};
use crate::types::Document;

/// Post-processing applied to a computed mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Store the exact mean.
    Exact,
    /// Round up to the next multiple of ten.
    CeilToTen,
}

impl Rounding {
    fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::Exact => value,
            Rounding::CeilToTen => (value / 10.0).ceil() * 10.0,
        }
    }
}

/// Arithmetic mean, or `None` for an empty input.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Describes one derived field: which dependents feed it and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRule {
    /// Human-readable name used in logs.
    pub name: &'static str,
    /// Collection holding the dependent records.
    pub child_collection: &'static str,
    /// Field on a dependent referencing its parent's `_id`.
    pub parent_ref: &'static str,
    /// Numeric field averaged across dependents.
    pub source_field: &'static str,
    /// Collection holding the parent record.
    pub parent_collection: &'static str,
    /// Derived field written on the parent.
    pub target_field: &'static str,
    pub rounding: Rounding,
}

/// Bootcamp `averageRating` from its reviews.
pub const AVERAGE_RATING: AggregateRule = AggregateRule {
    name: "average rating",
    child_collection: review::COLLECTION,
    parent_ref: review::BOOTCAMP,
    source_field: review::RATING,
    parent_collection: bootcamp::COLLECTION,
    target_field: bootcamp::AVERAGE_RATING,
    rounding: Rounding::Exact,
};

/// Bootcamp `averageCost` from its courses' tuition.
pub const AVERAGE_COST: AggregateRule = AggregateRule {
    name: "average cost",
    child_collection: course::COLLECTION,
    parent_ref: course::BOOTCAMP,
    source_field: course::TUITION,
    parent_collection: bootcamp::COLLECTION,
    target_field: bootcamp::AVERAGE_COST,
    rounding: Rounding::CeilToTen,
};

impl AggregateRule {
    /// Computes the derived value from the parent's current dependents.
    ///
    /// Dependents without a numeric source field are ignored. With no
    /// usable dependents the result is `null`, clearing the field.
    #[must_use]
    pub fn compute(&self, dependents: &[Document]) -> Value {
        let values = dependents
            .iter()
            .filter_map(|doc| doc.get(self.source_field).and_then(Value::as_f64));
        mean(values)
            .map(|m| self.rounding.apply(m))
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}
