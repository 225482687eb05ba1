use crate::domain::errors::StrategyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Concrete assignment of strategy parameters, ordered by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, Value>);

impl ParameterSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: String, value: Value) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reads a positive integer parameter, falling back to `default` when absent.
    pub fn get_period(&self, name: &str, default: usize) -> Result<usize, StrategyError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(value) => {
                let period = value
                    .as_u64()
                    .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0 && *v >= 0.0).map(|v| v as u64))
                    .ok_or_else(|| StrategyError::InvalidParameter {
                        name: name.to_string(),
                        reason: format!("expected a non-negative integer, got {}", value),
                    })?;
                if period == 0 {
                    return Err(StrategyError::InvalidParameter {
                        name: name.to_string(),
                        reason: "must be greater than 0".to_string(),
                    });
                }
                Ok(period as usize)
            }
        }
    }

    /// Reads a numeric parameter, falling back to `default` when absent.
    pub fn get_f64(&self, name: &str, default: f64) -> Result<f64, StrategyError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| StrategyError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("expected a number, got {}", value),
                }),
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Discrete candidate values per parameter name
pub type ParameterSpace = BTreeMap<String, Vec<Value>>;

/// Number of points in the Cartesian product of a parameter space,
/// saturating at `usize::MAX` for spaces too large to count.
pub fn space_size(space: &ParameterSpace) -> usize {
    space
        .values()
        .try_fold(1usize, |acc, v| acc.checked_mul(v.len()))
        .unwrap_or_else(|| {
            if space.values().any(|v| v.is_empty()) {
                0
            } else {
                usize::MAX
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_period() {
        let params = ParameterSet::new()
            .with("period", 14)
            .with("float_period", 20.0)
            .with("zero", 0)
            .with("text", "abc");

        assert_eq!(params.get_period("period", 5).unwrap(), 14);
        assert_eq!(params.get_period("float_period", 5).unwrap(), 20);
        assert_eq!(params.get_period("missing", 5).unwrap(), 5);
        assert!(params.get_period("zero", 5).is_err());
        assert!(params.get_period("text", 5).is_err());
    }

    #[test]
    fn test_get_f64() {
        let params = ParameterSet::new().with("threshold", 30).with("bad", json!([1, 2]));
        assert_eq!(params.get_f64("threshold", 0.0).unwrap(), 30.0);
        assert_eq!(params.get_f64("missing", 1.5).unwrap(), 1.5);
        assert!(params.get_f64("bad", 0.0).is_err());
    }

    #[test]
    fn test_display_is_sorted() {
        let params = ParameterSet::new().with("b", 2).with("a", 1);
        assert_eq!(params.to_string(), "{a=1, b=2}");
    }

    #[test]
    fn test_space_size() {
        let mut space = ParameterSpace::new();
        space.insert("a".to_string(), vec![json!(1), json!(2), json!(3)]);
        space.insert("b".to_string(), vec![json!(true), json!(false)]);
        assert_eq!(space_size(&space), 6);
        assert_eq!(space_size(&ParameterSpace::new()), 1);
    }

    #[test]
    fn test_space_size_saturates_on_huge_spaces() {
        let candidates: Vec<Value> = (0..20).map(|i| json!(i)).collect();
        let space: ParameterSpace = (0..15)
            .map(|i| (format!("p{:02}", i), candidates.clone()))
            .collect();
        assert_eq!(space_size(&space), usize::MAX);

        let mut with_empty = space.clone();
        with_empty.insert("empty".to_string(), Vec::new());
        assert_eq!(space_size(&with_empty), 0);
    }
}
