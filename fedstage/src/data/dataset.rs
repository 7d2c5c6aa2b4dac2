//! Datasets exchanged between components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header attached to every prediction output.
pub const PREDICT_HEADER: [&str; 5] = [
    "label",
    "predict_result",
    "predict_score",
    "predict_detail",
    "type",
];

/// A labeled sample: feature vector plus optional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Feature values, in header order.
    pub features: Vec<serde_json::Value>,
    /// The label, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<serde_json::Value>,
}

impl Instance {
    /// Creates an unlabeled instance.
    #[must_use]
    pub fn new(features: Vec<serde_json::Value>) -> Self {
        Self {
            features,
            label: None,
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<serde_json::Value>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the label unless it is absent or JSON null.
    #[must_use]
    pub fn present_label(&self) -> Option<&serde_json::Value> {
        self.label.as_ref().filter(|label| !label.is_null())
    }
}

/// The value side of a data record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataValue {
    /// A plain row of values (e.g. a prediction result).
    Row(Vec<serde_json::Value>),
    /// A labeled instance.
    Instance(Instance),
}

impl DataValue {
    /// Appends a provenance tag to the value.
    #[must_use]
    pub fn tagged(self, tag: ProvenanceTag) -> Self {
        let tag = serde_json::Value::String(tag.as_str().to_string());
        match self {
            Self::Row(mut row) => {
                row.push(tag);
                Self::Row(row)
            }
            Self::Instance(mut inst) => {
                inst.features.push(tag);
                Self::Instance(inst)
            }
        }
    }

    /// Returns the label if this is a labeled instance.
    #[must_use]
    pub fn label(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Row(_) => None,
            Self::Instance(inst) => inst.present_label(),
        }
    }

    /// Returns the feature values (the whole row for plain rows).
    #[must_use]
    pub fn values(&self) -> &[serde_json::Value] {
        match self {
            Self::Row(row) => row,
            Self::Instance(inst) => &inst.features,
        }
    }
}

/// Which data split produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceTag {
    /// Predictions on the training split.
    Train,
    /// Predictions on the evaluation split next to a training split.
    Validation,
    /// Predictions on an evaluation split alone.
    Test,
}

impl ProvenanceTag {
    /// Returns the tag as stored in records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for ProvenanceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column description of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Feature/column names.
    #[serde(default)]
    pub header: Vec<String>,
    /// Name of the label column, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    /// Name of the sample-id column, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid_name: Option<String>,
}

impl Schema {
    /// Creates a schema with the given header.
    #[must_use]
    pub fn with_header<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The schema set on every prediction output.
    #[must_use]
    pub fn predict() -> Self {
        Self::with_header(PREDICT_HEADER)
    }

    /// Sets the label column name.
    #[must_use]
    pub fn label_name(mut self, name: impl Into<String>) -> Self {
        self.label_name = Some(name.into());
        self
    }

    /// Sets the sample-id column name.
    #[must_use]
    pub fn sid_name(mut self, name: impl Into<String>) -> Self {
        self.sid_name = Some(name.into());
        self
    }
}

/// Records keyed by sample id, plus a schema.
///
/// Record order carries no meaning. A key may appear more than once after
/// [`Dataset::union`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<(String, DataValue)>,
    #[serde(default)]
    schema: Schema,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dataset from records.
    #[must_use]
    pub fn from_records(records: Vec<(String, DataValue)>) -> Self {
        Self {
            records,
            schema: Schema::default(),
        }
    }

    /// Adds a record.
    pub fn insert(&mut self, key: impl Into<String>, value: DataValue) {
        self.records.push((key.into(), value));
    }

    /// Sets the schema (builder style).
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Replaces the schema.
    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the records.
    #[must_use]
    pub fn records(&self) -> &[(String, DataValue)] {
        &self.records
    }

    /// Consumes the dataset, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<(String, DataValue)> {
        self.records
    }

    /// Returns every value stored under `key`.
    pub fn get<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a DataValue> + 'a {
        self.records
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends the provenance tag to every record value.
    #[must_use]
    pub fn tagged(self, tag: ProvenanceTag) -> Self {
        Self {
            records: self
                .records
                .into_iter()
                .map(|(k, v)| (k, v.tagged(tag)))
                .collect(),
            schema: self.schema,
        }
    }

    /// Unions two datasets. Keys present in both are kept twice.
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        self.records.extend(other.records);
        self
    }
}

impl FromIterator<(String, DataValue)> for Dataset {
    fn from_iter<T: IntoIterator<Item = (String, DataValue)>>(iter: T) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagging_appends_to_rows_and_instances() {
        let ds: Dataset = vec![
            ("a".to_string(), DataValue::Row(vec![json!(1), json!(1), json!(0.9), json!({})])),
            ("b".to_string(), DataValue::Instance(Instance::new(vec![json!(0.1)]))),
        ]
        .into_iter()
        .collect();

        let tagged = ds.tagged(ProvenanceTag::Train);
        let a = tagged.get("a").next().unwrap();
        assert_eq!(a.values().last(), Some(&json!("train")));
        let b = tagged.get("b").next().unwrap();
        assert_eq!(b.values(), &[json!(0.1), json!("train")]);
    }

    #[test]
    fn test_union_keeps_duplicate_keys() {
        let left = Dataset::from_records(vec![("a".into(), DataValue::Row(vec![json!(1)]))]);
        let right = Dataset::from_records(vec![("a".into(), DataValue::Row(vec![json!(2)]))]);
        let merged = left.union(right);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("a").count(), 2);
    }

    #[test]
    fn test_present_label_ignores_null() {
        let inst = Instance::new(vec![]).with_label(serde_json::Value::Null);
        assert!(inst.present_label().is_none());
        let inst = Instance::new(vec![]).with_label(1);
        assert_eq!(inst.present_label(), Some(&json!(1)));
    }

    #[test]
    fn test_predict_schema() {
        let schema = Schema::predict();
        assert_eq!(schema.header, PREDICT_HEADER.to_vec());
        assert!(schema.label_name.is_none());
    }

    #[test]
    fn test_provenance_tag_display() {
        assert_eq!(ProvenanceTag::Validation.to_string(), "validation");
        assert_eq!(serde_json::to_string(&ProvenanceTag::Test).unwrap(), r#""test""#);
    }
}
