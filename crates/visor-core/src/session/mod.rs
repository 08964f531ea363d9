//! Session domain module.
//!
//! - `model`: the `Session` entity and list summaries
//! - `message`: conversation message types
//! - `stage`: the workflow stage enum

mod message;
mod model;
mod stage;

pub use message::{Message, Sender};
pub use model::{PLACEHOLDER_NAME, Session, SessionSummary};
pub use stage::WorkflowStage;
