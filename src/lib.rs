pub mod actions;
pub mod assembler;
pub mod buildspec;
pub mod daemons;
pub mod errors;
pub mod functions;
pub mod lockfile;
pub mod manifest;
pub mod presets;
pub mod registry;
pub mod statemachine;
pub mod template;
pub mod validation;

pub use assembler::{PipelineAssembler, PipelineModel, assemble};
pub use errors::AssemblyError;
pub use manifest::Manifest;
pub use registry::{Artifact, ArtifactRegistry, PipelineStage, StageKind};
