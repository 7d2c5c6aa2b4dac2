//! Binding of job-supplied overrides onto a component's declared parameters.

use super::CrossValidationParam;
use crate::errors::ValidationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A component's parameter block.
///
/// The serialized form of the defaults is the declared schema: every field an
/// override may touch must appear in it.
pub trait ComponentParam: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// Component-specific self-check, run after overrides are applied.
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Explicit `need_run` setting, if this parameter block has one.
    fn need_run(&self) -> Option<bool> {
        None
    }

    /// Cross-validation sub-config, if this parameter block has one.
    fn cv_param(&self) -> Option<&CrossValidationParam> {
        None
    }
}

/// Parameters after binding, with the behavioral flags resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParams<P> {
    /// The merged and checked parameters.
    pub params: P,
    /// Whether the component should run at all. Defaults to `true`.
    pub need_run: bool,
    /// Whether the run cross-validates. Defaults to `false`.
    pub need_cv: bool,
}

/// Merges overrides into declared defaults and validates the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder;

impl ParameterBinder {
    /// Creates a binder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Binds `overrides` onto `defaults`.
    ///
    /// `overrides` must be a JSON object (or null for "no overrides"). Nested
    /// objects merge field by field; a sub-config or map whose default is
    /// null or empty takes the override object whole. Every overridden key
    /// must survive the round trip through `P`, so a key the parameter type
    /// does not declare is rejected with its dotted path.
    pub fn bind<P: ComponentParam>(
        &self,
        defaults: &P,
        overrides: &serde_json::Value,
    ) -> Result<BoundParams<P>, ValidationError> {
        let mut merged = serde_json::to_value(defaults)
            .map_err(|e| ValidationError::new(format!("cannot serialize defaults: {e}")))?;

        match (merged.as_object_mut(), overrides) {
            (_, serde_json::Value::Null) => {}
            (Some(base), serde_json::Value::Object(patch)) => overlay(base, patch),
            (None, _) => {
                return Err(ValidationError::new("declared parameters must be an object"));
            }
            (Some(_), _) => {
                return Err(ValidationError::new("parameter overrides must be an object"));
            }
        }

        let params: P = serde_json::from_value(merged)
            .map_err(|e| ValidationError::new(format!("cannot bind parameters: {e}")))?;
        if let serde_json::Value::Object(patch) = overrides {
            let bound = serde_json::to_value(&params)
                .map_err(|e| ValidationError::new(format!("cannot serialize parameters: {e}")))?;
            if let serde_json::Value::Object(bound) = &bound {
                ensure_declared(bound, patch, "")?;
            }
        }
        params.check()?;
        if let Some(cv) = params.cv_param() {
            cv.check()?;
        }

        let need_cv = params.cv_param().map_or(false, |cv| cv.need_cv);
        let need_run = params.need_run().unwrap_or(true);
        tracing::debug!(need_run, need_cv, "Bound component parameters");

        Ok(BoundParams {
            params,
            need_run,
            need_cv,
        })
    }
}

fn overlay(
    base: &mut serde_json::Map<String, serde_json::Value>,
    patch: &serde_json::Map<String, serde_json::Value>,
) {
    for (key, value) in patch {
        match (base.get_mut(key), value) {
            (Some(serde_json::Value::Object(inner)), serde_json::Value::Object(inner_patch)) => {
                overlay(inner, inner_patch);
            }
            (Some(slot), _) => *slot = value.clone(),
            (None, _) => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fails on the first overridden key missing from the bound parameters.
///
/// Serde drops keys a struct does not declare, so anything the override named
/// but the round trip lost was never a parameter.
fn ensure_declared(
    bound: &serde_json::Map<String, serde_json::Value>,
    patch: &serde_json::Map<String, serde_json::Value>,
    prefix: &str,
) -> Result<(), ValidationError> {
    for (key, value) in patch {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let Some(slot) = bound.get(key) else {
            return Err(ValidationError::unknown_field(path));
        };
        if let (serde_json::Value::Object(inner), serde_json::Value::Object(inner_patch)) =
            (slot, value)
        {
            ensure_declared(inner, inner_patch, &path)?;
        }
    }
    Ok(())
}
