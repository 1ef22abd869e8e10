use crate::adapters::database::{DatabaseError, UserRepository};
use crate::adapters::firebase::FirebaseApp;
use crate::domain::user::UserSnapshot;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Reads the users collection through the Realtime Database REST API.
#[derive(Clone, Debug)]
pub struct RealtimeDbRepository {
    app: Arc<FirebaseApp>,
    users_url: String,
}

impl RealtimeDbRepository {
    #[must_use]
    pub fn new(app: Arc<FirebaseApp>, users_path: &str) -> Self {
        let users_url = format!("{}/{}.json", app.database_url(), users_path.trim_matches('/'));
        Self { app, users_url }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DatabaseError> {
        let request = self.app.authorize(self.app.http().get(url)).await?;
        let response = request.send().await.map_err(DatabaseError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatabaseError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl UserRepository for RealtimeDbRepository {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn fetch_all(&self) -> Result<UserSnapshot, DatabaseError> {
        let value: Value = self.get(&self.users_url).await?.json().await.map_err(DatabaseError::Decode)?;
        let snapshot = UserSnapshot::from_value(&value);
        tracing::debug!(users = snapshot.len(), "Read users collection");
        Ok(snapshot)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.get(&format!("{}?shallow=true", self.users_url)).await.map(|_| ())
    }
}
