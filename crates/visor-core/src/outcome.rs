//! Result type for optimistic mutations.

use crate::error::VisorError;

/// The outcome of an optimistic state mutation.
///
/// Every mutating operation that applies local state before remote
/// confirmation reports its fate explicitly instead of relying on error
/// timing: either the change (and any remote effect) stuck, or it was
/// undone/reconciled and the reason is attached.
#[derive(Debug, Clone)]
pub enum MutationOutcome<T> {
    /// The mutation was confirmed and local state keeps it.
    Applied(T),
    /// The remote call failed; local state was restored or reconciled.
    RolledBack(VisorError),
}

impl<T> MutationOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack(_))
    }

    /// The applied value, if any.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::RolledBack(_) => None,
        }
    }

    /// The rollback reason, if any.
    pub fn rollback_reason(&self) -> Option<&VisorError> {
        match self {
            Self::Applied(_) => None,
            Self::RolledBack(err) => Some(err),
        }
    }
}
