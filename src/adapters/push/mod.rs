pub mod fcm;

use crate::adapters::credentials::CredentialError;
use crate::domain::notification::{AvailabilityNotification, MulticastResponse};
use async_trait::async_trait;
use thiserror::Error;

pub use fcm::FcmPushProvider;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Multicast send requires at least one token")]
    EmptyTokens,
    #[error("Failed to obtain push credentials: {0}")]
    Credentials(#[from] CredentialError),
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    /// Delivers one payload to every token in a single multicast call.
    ///
    /// Per-token failures are reported inside the response; an `Err` means the call as a whole failed.
    ///
    /// # Errors
    /// Returns `PushError::EmptyTokens` for an empty token list and `PushError::Credentials`
    /// if the request cannot be authorized.
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &AvailabilityNotification,
    ) -> Result<MulticastResponse, PushError>;
}
