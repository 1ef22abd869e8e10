use crate::adapters::credentials::{CredentialError, CredentialSource, MetadataTokenSource};
use crate::config::{CredentialKind, FirebaseConfig};
use std::sync::Arc;

/// Process-wide Firebase handle: project identity, HTTP client and credentials.
///
/// Built once during bootstrap and shared by every adapter that talks to Firebase.
#[derive(Debug)]
pub struct FirebaseApp {
    project_id: String,
    database_url: String,
    fcm_endpoint: String,
    http: reqwest::Client,
    credentials: CredentialSource,
}

impl FirebaseApp {
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        database_url: &str,
        fcm_endpoint: &str,
        http: reqwest::Client,
        credentials: CredentialSource,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            database_url: database_url.trim_end_matches('/').to_string(),
            fcm_endpoint: fcm_endpoint.trim_end_matches('/').to_string(),
            http,
            credentials,
        }
    }

    /// Initializes the shared handle from configuration.
    ///
    /// # Errors
    /// Returns `CredentialError::MissingToken` if static credentials are selected without a token,
    /// or a transport error if the HTTP client cannot be built.
    pub fn initialize(config: &FirebaseConfig) -> Result<Arc<Self>, CredentialError> {
        let http = reqwest::Client::builder().user_agent(concat!("availability-notifier/", env!("CARGO_PKG_VERSION"))).build()?;

        let credentials = match config.credential_source {
            CredentialKind::None => CredentialSource::None,
            CredentialKind::Static => {
                CredentialSource::Static(config.access_token.clone().ok_or(CredentialError::MissingToken)?)
            }
            CredentialKind::Metadata => {
                CredentialSource::Metadata(MetadataTokenSource::new(http.clone(), &config.metadata_url))
            }
        };

        tracing::info!(
            project_id = %config.project_id,
            database_url = %config.database_url,
            credential_source = ?config.credential_source,
            "Firebase app initialized"
        );

        Ok(Arc::new(Self::new(
            config.project_id.clone(),
            &config.database_url,
            &config.fcm_endpoint,
            http,
            credentials,
        )))
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Base URL of the Realtime Database, without a trailing slash.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Base URL of the FCM API, without a trailing slash.
    #[must_use]
    pub fn fcm_endpoint(&self) -> &str {
        &self.fcm_endpoint
    }

    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Attaches the current bearer token to a request, if credentials are configured.
    ///
    /// # Errors
    /// Returns an error if a token cannot be obtained.
    pub async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, CredentialError> {
        Ok(match self.credentials.access_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    /// Confirms that credentials can currently be obtained.
    ///
    /// # Errors
    /// Returns an error if the credential source fails.
    pub async fn check_credentials(&self) -> Result<(), CredentialError> {
        self.credentials.access_token().await.map(|_| ())
    }
}
