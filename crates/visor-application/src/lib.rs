//! Application layer for the Visor client core.
//!
//! This crate provides the orchestration services that coordinate the
//! domain model and the remote gateways: the extraction pipeline, the
//! conversation engine, the session registry and the workflow controller.

pub mod chat_engine;
pub mod extraction;
pub mod session_registry;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use chat_engine::ChatEngine;
pub use extraction::{ExtractPhase, Extraction, ExtractionPipeline, PhaseListener};
pub use session_registry::SessionRegistry;
pub use workflow::WorkflowController;
