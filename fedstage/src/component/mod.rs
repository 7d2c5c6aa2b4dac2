//! Component lifecycle: capabilities, run context, stage selection, routing.
//!
//! A concrete ML component implements [`Component`]. The
//! [`ComponentRunner`] builds nothing itself: it binds parameters, lets the
//! [`StageSelector`] pick and drive the stage, then persists what came out.

mod context;
mod inputs;
mod router;
mod runner;
mod selector;

pub use context::RunContext;
pub use inputs::DataInputs;
pub use router::DataSetRouter;
pub use runner::{ComponentRunner, RunReport, RunRequest, DEFAULT_OUTPUT_DATA_NAME};
pub use selector::{StageRun, StageSelector};

use crate::core::ModelArtifact;
use crate::data::Dataset;
use crate::errors::{FedstageError, FedstageResult};
use crate::params::ComponentParam;
use async_trait::async_trait;

/// Capabilities a pipeline component may offer.
///
/// Only `module_name` and `default_param` are required. The orchestrator
/// calls just the capabilities the selected stage needs; the defaults
/// produce no output, and cross validation is reported as unsupported.
#[async_trait]
pub trait Component: Send + Sync {
    /// The component's parameter block.
    type Param: ComponentParam;

    /// Module identifier (e.g. "HeteroLR").
    fn module_name(&self) -> &str;

    /// Declared parameters with their defaults.
    fn default_param(&self) -> Self::Param;

    /// Receives the bound parameters before any stage runs.
    fn init_model(&mut self, _params: &Self::Param) -> FedstageResult<()> {
        Ok(())
    }

    /// Loads a trained or isometric model.
    async fn load_model(&mut self, _model: &ModelArtifact) -> FedstageResult<()> {
        Ok(())
    }

    /// Trains on `data`. May return a dataset of its own.
    async fn fit(&mut self, _ctx: &RunContext, _data: &Dataset) -> FedstageResult<Option<Dataset>> {
        Ok(None)
    }

    /// Predicts on `data`. Rows follow the prediction header minus "type".
    async fn predict(
        &mut self,
        _ctx: &RunContext,
        _data: &Dataset,
    ) -> FedstageResult<Option<Dataset>> {
        Ok(None)
    }

    /// Applies the loaded model to `data`.
    async fn transform(
        &mut self,
        _ctx: &RunContext,
        _data: &Dataset,
    ) -> FedstageResult<Option<Dataset>> {
        Ok(None)
    }

    /// Runs cross validation over the training data.
    ///
    /// Implementations extend the flow id per fold through
    /// [`RunContext::push_flow_id`] so fold metrics stay apart.
    async fn cross_validation(
        &mut self,
        _ctx: &mut RunContext,
        _data: Option<&Dataset>,
    ) -> FedstageResult<()> {
        Err(FedstageError::component(
            self.module_name(),
            "cross_validation",
            "not supported by this component",
        ))
    }

    /// Exports the trained model, if there is one.
    fn export_model(&self) -> Option<ModelArtifact> {
        None
    }
}
