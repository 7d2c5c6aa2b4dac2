//! Metric points and metric metadata.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The x-axis identifier of a metric point (iteration, threshold, label...).
///
/// Keys order numbers before text; numbers compare by IEEE total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricKey {
    /// A numeric key.
    Number(f64),
    /// A textual key.
    Text(String),
}

impl MetricKey {
    /// Converts the key to a JSON value, integers rendered without a fraction.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Number(n) => integral(*n).map_or_else(|| serde_json::json!(n), |i| serde_json::json!(i)),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(n as i64)
    } else {
        None
    }
}

impl Ord for MetricKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for MetricKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MetricKey {}

impl Hash for MetricKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Number(n) => {
                0u8.hash(state);
                n.to_bits().hash(state);
            }
            Self::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => match integral(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! metric_key_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetricKey {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from(value: $t) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

metric_key_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<&str> for MetricKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One point of a metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// The point key.
    pub key: MetricKey,
    /// The point value.
    pub value: serde_json::Value,
}

impl Metric {
    /// Creates a new metric point.
    #[must_use]
    pub fn new(key: impl Into<MetricKey>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Describes how a metric series should be interpreted or rendered.
///
/// The core stores it and hands it back; it never parses `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMeta {
    /// Display name of the series.
    pub name: String,
    /// Plot/metric type (e.g. "LOSS", "ROC", "KS").
    pub metric_type: String,
    /// Free-form descriptor entries (axis labels, units, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MetricMeta {
    /// Creates new metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, metric_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: metric_type.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Adds a descriptor entry.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Converts to a flat dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("name".to_string(), serde_json::json!(self.name));
        map.insert("metric_type".to_string(), serde_json::json!(self.metric_type));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            MetricKey::from("b"),
            MetricKey::from(3),
            MetricKey::from(0.5),
            MetricKey::from("a"),
            MetricKey::from(-1),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["-1", "0.5", "3", "a", "b"]);
    }

    #[test]
    fn test_integer_and_float_keys_are_equal() {
        assert_eq!(MetricKey::from(1), MetricKey::from(1.0));
    }

    #[test]
    fn test_key_json() {
        assert_eq!(MetricKey::from(2).to_json(), serde_json::json!(2));
        assert_eq!(MetricKey::from(0.25).to_json(), serde_json::json!(0.25));
        assert_eq!(MetricKey::from("auc").to_json(), serde_json::json!("auc"));
    }

    #[test]
    fn test_key_deserialize_untagged() {
        let key: MetricKey = serde_json::from_str("7").unwrap();
        assert_eq!(key, MetricKey::from(7));
        let key: MetricKey = serde_json::from_str(r#""fold_0""#).unwrap();
        assert_eq!(key, MetricKey::from("fold_0"));
    }

    #[test]
    fn test_meta_to_dict_is_flat() {
        let meta = MetricMeta::new("loss", "LOSS").with_extra("unit_name", "iters");
        let dict = meta.to_dict();
        assert_eq!(dict["name"], "loss");
        assert_eq!(dict["metric_type"], "LOSS");
        assert_eq!(dict["unit_name"], "iters");
    }
}
