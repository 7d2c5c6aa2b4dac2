//! Core domain model types for fedstage.
//!
//! - Run scopes (job / component / role / party)
//! - The lifecycle [`Stage`] enum and its transition function
//! - Model artifacts and the model handles supplied to a run

mod artifact;
mod scope;
mod stage;

pub use artifact::{ModelArtifact, ModelInputs, META_SUFFIX, PARAM_SUFFIX};
pub use scope::{ComponentScope, JobScope, PartyRef};
pub use stage::Stage;
