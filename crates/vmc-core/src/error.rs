//! Admission outcomes that reject a vend request.

use vmc_types::ItemId;

/// Message returned for an empty or malformed item list.
pub const INVALID_ITEMS_MESSAGE: &str =
    "Invalid items array. Expected non-empty array of item numbers.";

/// Message returned when a vend is already in progress.
pub const BUSY_MESSAGE: &str = "Vending machine is currently busy";

/// Message returned once the machine has been shut down.
pub const CLOSED_MESSAGE: &str = "Vending machine is shutting down";

/// Why a vend request was not admitted.
///
/// The machine state is untouched by a rejection. After `InvalidRequest`
/// or `Busy` the caller may re-submit later; after `Closed` it may not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VendError {
    /// The item list was missing, malformed or empty.
    #[error("{message}")]
    InvalidRequest {
        /// Caller-facing description of the problem.
        message: String,
    },

    /// Another vend is in progress (single-flight).
    #[error("Vending machine is currently busy")]
    Busy {
        /// Items of the vend currently in progress.
        current_items: Vec<ItemId>,
    },

    /// The machine has been shut down and admits nothing further.
    #[error("Vending machine is shutting down")]
    Closed,
}

impl VendError {
    /// The standard rejection for an empty or non-array item list.
    pub fn invalid_items() -> Self {
        Self::InvalidRequest {
            message: INVALID_ITEMS_MESSAGE.to_owned(),
        }
    }

    /// Items of the in-progress vend, if this is a busy rejection.
    pub fn current_items(&self) -> Option<&[ItemId]> {
        match self {
            Self::Busy { current_items } => Some(current_items),
            Self::InvalidRequest { .. } | Self::Closed => None,
        }
    }
}
