//! Weighted metric sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input to a weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedMetric {
    pub value: f64,
    pub weight: f64,
}

impl WeightedMetric {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }

    /// Finite and non-negative in both value and weight.
    pub fn is_well_formed(&self) -> bool {
        self.value.is_finite() && self.weight.is_finite() && self.value >= 0.0 && self.weight >= 0.0
    }
}

/// Metric name → weighted value. Ordered so scores are computed in a stable
/// summation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedMetricSet {
    metrics: BTreeMap<String, WeightedMetric>,
}

impl WeightedMetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64, weight: f64) -> Self {
        self.insert(name, value, weight);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64, weight: f64) {
        self.metrics
            .insert(name.into(), WeightedMetric::new(value, weight));
    }

    pub fn get(&self, name: &str) -> Option<&WeightedMetric> {
        self.metrics.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightedMetric)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn weight_sum(&self) -> f64 {
        self.metrics.values().map(|m| m.weight).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, WeightedMetric)> for WeightedMetricSet {
    fn from_iter<I: IntoIterator<Item = (S, WeightedMetric)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_weight_sum() {
        let set = WeightedMetricSet::new()
            .with("uptime", 99.0, 0.6)
            .with("users", 10.0, 0.4);
        assert_eq!(set.len(), 2);
        assert!((set.weight_sum() - 1.0).abs() < f64::EPSILON);
        assert_eq!(set.get("users"), Some(&WeightedMetric::new(10.0, 0.4)));
    }

    #[test]
    fn test_well_formed() {
        assert!(WeightedMetric::new(0.0, 0.0).is_well_formed());
        assert!(!WeightedMetric::new(-1.0, 1.0).is_well_formed());
        assert!(!WeightedMetric::new(1.0, -1.0).is_well_formed());
        assert!(!WeightedMetric::new(f64::NAN, 1.0).is_well_formed());
        assert!(!WeightedMetric::new(1.0, f64::INFINITY).is_well_formed());
    }

    #[test]
    fn test_json_shape() {
        let set = WeightedMetricSet::new().with("uptime", 100.0, 0.6);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["uptime"]["weight"], 0.6);
    }
}
