//! Error types for the assignment store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No box with the given id.
    #[error("box {box_id} not found")]
    BoxNotFound {
        /// The missing box id.
        box_id: u32,
    },

    /// No screen with the given id.
    #[error("screen {screen_id} not found")]
    ScreenNotFound {
        /// The missing screen id.
        screen_id: u32,
    },

    /// The box already has a different owning user.
    #[error("box {box_id} is already assigned to another user")]
    BoxAlreadyAssigned {
        /// The contested box id.
        box_id: u32,
    },

    /// No unowned box remains.
    #[error("no free boxes available")]
    NoFreeBoxes,

    /// The user owns no box, but one was required.
    #[error("user '{user}' has no assigned box")]
    UserHasNoBox {
        /// The user id.
        user: String,
    },

    /// The screen is already paired to a different box.
    #[error("screen {screen_id} is already paired to another box")]
    ScreenAlreadyPaired {
        /// The contested screen id.
        screen_id: u32,
    },

    /// The box is already paired to a different screen.
    #[error("box {box_id} is already paired to another screen")]
    BoxAlreadyPaired {
        /// The contested box id.
        box_id: u32,
    },

    /// Reading or writing the backing document failed.
    #[error("failed to persist datastore: {message}")]
    Persist {
        /// What went wrong.
        message: String,
    },
}

impl StoreError {
    /// Creates a box-not-found error.
    pub fn box_not_found(box_id: u32) -> Self {
        Self::BoxNotFound { box_id }
    }

    /// Creates a screen-not-found error.
    pub fn screen_not_found(screen_id: u32) -> Self {
        Self::ScreenNotFound { screen_id }
    }

    /// Creates a user-has-no-box error.
    pub fn user_has_no_box(user: impl Into<String>) -> Self {
        Self::UserHasNoBox { user: user.into() }
    }

    /// Creates a persistence error.
    pub fn persist(message: impl Into<String>) -> Self {
        Self::Persist {
            message: message.into(),
        }
    }

    /// True if the error is a relationship conflict rather than a
    /// missing record or infrastructure failure.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::BoxAlreadyAssigned { .. }
                | StoreError::ScreenAlreadyPaired { .. }
                | StoreError::BoxAlreadyPaired { .. }
        )
    }
}
