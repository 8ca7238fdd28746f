use thiserror::Error;
use uuid::Uuid;

/// Why the composer refused an action.
///
/// Every variant leaves the draft exactly as it was. `Display` is the text
/// shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    #[error("This order is cancelled and cannot be modified")]
    Locked,

    #[error("Quantity must be at least 1")]
    InvalidQuantity(i32),

    #[error("New orders always start as pending")]
    StatusFixedOnCreate,

    #[error("Select a product first")]
    NoProductSelected,

    #[error("Product {0} is not in the catalog")]
    UnknownProduct(Uuid),

    #[error("Product {0} is not available for rent")]
    InactiveProduct(Uuid),

    #[error("There is no line item at position {index}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("You must add at least one product")]
    EmptyOrder,

    #[error("The order is already being saved")]
    SubmitInProgress,

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    LoadFailed(String),
}
