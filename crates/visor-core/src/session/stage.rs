//! Workflow stage type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stage the workflow controller is in. Exactly one is active per
/// controller instance.
///
/// Forward flow is Intro → Upload → Extracting → Review → Converse.
/// Selecting an existing session jumps straight to Converse; starting a new
/// one resets to Intro. The controller never rests in an intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// Landing state: language choice, nothing captured yet.
    Intro,
    /// Waiting for a product image.
    Upload,
    /// The extraction pipeline is running.
    Extracting,
    /// The user is reviewing and editing the extracted product information.
    Review,
    /// A session is bound and message traffic is live.
    Converse,
}

impl WorkflowStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intro => "Intro",
            Self::Upload => "Upload",
            Self::Extracting => "Extracting",
            Self::Review => "Review",
            Self::Converse => "Converse",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
