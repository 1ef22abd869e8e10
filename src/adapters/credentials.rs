use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
// Refresh a bit before the platform-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Static credentials selected but no access token configured")]
    MissingToken,
    #[error("Metadata server request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Metadata server returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Fetches OAuth2 access tokens for the runtime service account from the metadata server.
#[derive(Debug)]
pub struct MetadataTokenSource {
    http: reqwest::Client,
    url: String,
    cache: Mutex<Option<CachedToken>>,
}

impl MetadataTokenSource {
    #[must_use]
    pub fn new(http: reqwest::Client, metadata_url: &str) -> Self {
        Self {
            http,
            url: format!("{}{METADATA_TOKEN_PATH}", metadata_url.trim_end_matches('/')),
            cache: Mutex::new(None),
        }
    }

    /// Returns a cached token, fetching a fresh one when it is missing or about to expire.
    ///
    /// # Errors
    /// Returns an error if the metadata server is unreachable or answers with a non-success status.
    pub async fn token(&self) -> Result<String, CredentialError> {
        // Lock held across the fetch: at most one refresh in flight.
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.refresh_at) {
            return Ok(cached.token.clone());
        }

        let response = self.http.get(&self.url).header("Metadata-Flavor", "Google").send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::Status(status));
        }

        let body: MetadataTokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = body.expires_in, "Fetched access token from metadata server");

        let token = body.access_token;
        *cache = Some(CachedToken { token: token.clone(), refresh_at: Instant::now() + lifetime });
        Ok(token)
    }
}

/// Where outgoing requests get their bearer token from.
#[derive(Debug)]
pub enum CredentialSource {
    None,
    Static(String),
    Metadata(MetadataTokenSource),
}

impl CredentialSource {
    /// Resolves the bearer token for the next request, if any.
    ///
    /// # Errors
    /// Returns an error if the metadata server cannot supply a token.
    pub async fn access_token(&self) -> Result<Option<String>, CredentialError> {
        match self {
            Self::None => Ok(None),
            Self::Static(token) => Ok(Some(token.clone())),
            Self::Metadata(source) => source.token().await.map(Some),
        }
    }
}
