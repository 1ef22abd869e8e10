pub mod rtdb;

use crate::adapters::credentials::CredentialError;
use crate::domain::user::UserSnapshot;
use async_trait::async_trait;
use thiserror::Error;

pub use rtdb::RealtimeDbRepository;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to obtain database credentials: {0}")]
    Credentials(#[from] CredentialError),
    #[error("Database request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Database returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("Database returned an undecodable body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Read access to the users collection.
#[async_trait]
pub trait UserRepository: Send + Sync + std::fmt::Debug {
    /// Reads the entire users collection as one snapshot.
    ///
    /// # Errors
    /// Returns an error if the collection cannot be read.
    async fn fetch_all(&self) -> Result<UserSnapshot, DatabaseError>;

    /// Performs a cheap read to confirm the database is reachable.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    async fn ping(&self) -> Result<(), DatabaseError>;
}
