//! Test fixtures: scopes, datasets, models and job documents.

use serde_json::json;

use crate::core::{ComponentScope, JobScope, ModelArtifact};
use crate::data::{DataValue, Dataset, Instance, Schema};

/// Job id used by the fixtures.
pub const JOB_ID: &str = "job_202401010000";

/// Guest party id used by the fixtures.
pub const GUEST_PARTY_ID: u64 = 9999;

/// Host party id used by the fixtures.
pub const HOST_PARTY_ID: u64 = 10000;

/// The guest's view of [`JOB_ID`].
#[must_use]
pub fn guest_job() -> JobScope {
    JobScope::new(JOB_ID, "guest", GUEST_PARTY_ID)
}

/// A component of [`JOB_ID`] run by the guest.
#[must_use]
pub fn guest_scope(component: &str) -> ComponentScope {
    guest_job().component(component)
}

/// A component of [`JOB_ID`] run by the host.
#[must_use]
pub fn host_scope(component: &str) -> ComponentScope {
    JobScope::new(JOB_ID, "host", HOST_PARTY_ID).component(component)
}

/// Labeled instances with two features, one per key.
///
/// Labels alternate 1, 0, 1, ... in key order.
#[must_use]
pub fn instances(keys: &[&str]) -> Dataset {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            let x = f64::from(u32::try_from(i).unwrap_or(u32::MAX)) / 10.0;
            let label = u8::from(i % 2 == 0);
            let inst = Instance::new(vec![json!(x), json!(1.0 - x)]).with_label(label);
            ((*key).to_string(), DataValue::Instance(inst))
        })
        .collect::<Dataset>()
        .with_schema(Schema::with_header(["x0", "x1"]).label_name("y").sid_name("id"))
}

/// Prediction rows `[label, predict_result, predict_score, predict_detail]`.
#[must_use]
pub fn prediction_rows(keys: &[&str]) -> Dataset {
    keys.iter()
        .map(|key| {
            let row = vec![json!(1), json!(1), json!(0.9), json!({"0": 0.1, "1": 0.9})];
            ((*key).to_string(), DataValue::Row(row))
        })
        .collect()
}

/// A model with a parameter and a metadata block.
#[must_use]
pub fn lr_model() -> ModelArtifact {
    ModelArtifact::new()
        .with_buffer("HeteroLRMeta", json!({"penalty": "L2", "need_run": true}))
        .with_buffer(
            "HeteroLRParam",
            json!({"iters": 3, "weight": {"x0": 0.3, "x1": -0.2}, "intercept": 0.1}),
        )
}

/// Runtime configuration of [`JOB_ID`] as submitted by the guest.
#[must_use]
pub fn runtime_conf(model_key: &str) -> serde_json::Value {
    json!({
        "initiator": {"role": "guest", "party_id": GUEST_PARTY_ID},
        "role": {"guest": [GUEST_PARTY_ID], "host": [HOST_PARTY_ID]},
        "job_parameters": {"model_key": model_key}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_alternate_labels() {
        let data = instances(&["a", "b", "c"]);
        let labels: Vec<_> = data
            .records()
            .iter()
            .map(|(_, v)| v.label().cloned())
            .collect();
        assert_eq!(labels, vec![Some(json!(1)), Some(json!(0)), Some(json!(1))]);
        assert_eq!(data.schema().label_name.as_deref(), Some("y"));
    }

    #[test]
    fn test_scopes() {
        assert_eq!(guest_scope("lr_0").to_string(), "job_202401010000/lr_0/guest/9999");
        assert_eq!(host_scope("lr_0").party_id(), HOST_PARTY_ID);
    }
}
