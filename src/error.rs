//! Error types shared by the grid model, the session registry and the router.

use thiserror::Error;

use crate::core::UserId;
use crate::wm::MenuType;

#[derive(Error, Debug)]
pub enum MenuError {
    /// No registered display adapter supports the menu type.
    #[error("No display adapter supports menu type {0}")]
    NoAdapter(MenuType),

    /// The window was built without a manager, or its manager has been dropped.
    #[error("Menu '{0}' is not bound to a menu manager")]
    RegistryUnbound(String),

    #[error("Invalid menu dimensions: {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },

    #[error("Position ({row}, {column}) is outside {rows}x{columns} bounds")]
    OutOfBounds {
        row: i64,
        column: i64,
        rows: usize,
        columns: usize,
    },

    #[error("Pattern has no rows")]
    EmptyPattern,

    #[error("Pattern row {row} is {actual} columns wide, expected {expected}")]
    RaggedPattern {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The content provider failed while initializing a new session.
    #[error("Failed to initialize menu '{id}': {source}")]
    Init {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The display adapter failed to put the menu on screen.
    #[error("Failed to display menu '{id}': {source}")]
    Display {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The session contents are already mutably borrowed by a running callback.
    #[error("Contents of user {0} are in use by a running callback")]
    ContentsBusy(UserId),

    /// A cell handler failed. Passed through to the host untouched.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MenuError>;

impl MenuError {
    pub(crate) fn out_of_bounds(row: i64, column: i64, rows: usize, columns: usize) -> Self {
        MenuError::OutOfBounds {
            row,
            column,
            rows,
            columns,
        }
    }

    /// Missing adapter, unbound manager or bad dimensions.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MenuError::NoAdapter(_) | MenuError::RegistryUnbound(_) | MenuError::InvalidDimensions { .. }
        )
    }
}
