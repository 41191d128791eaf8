//! Errors from bus subscription (§4.2, §7).

use thiserror::Error;

/// Errors returned by [`crate::BroadcastBus::subscribe`].
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// A subscriber is already registered under this id (§4.2: "fails if id
    /// already exists").
    #[error("subscriber '{id}' is already registered")]
    Duplicate {
        /// The id that was already present.
        id: String,
    },
}
