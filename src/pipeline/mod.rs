//! # Caption Pipeline Module
//!
//! The request orchestration core: phase sequencing, timing diagnostics,
//! the error taxonomy, and the success/failure wire shapes.

pub mod error;
pub mod orchestrator;
pub mod response;
pub mod timing;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::CaptionPipeline;
pub use response::{CaptionFailure, CaptionOutcome, FailureDebug};
