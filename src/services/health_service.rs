use crate::adapters::database::UserRepository;
use crate::adapters::firebase::FirebaseApp;
use crate::config::HealthConfig;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("availability-notifier");
        Self {
            status: meter
                .i64_gauge("availability_notifier_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    users: Arc<dyn UserRepository>,
    firebase: Arc<FirebaseApp>,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, firebase: Arc<FirebaseApp>, config: HealthConfig) -> Self {
        Self { users, firebase, config, metrics: Metrics::new() }
    }

    fn record(&self, component: &'static str, ok: bool) {
        self.metrics.status.record(i64::from(ok), &[KeyValue::new("component", component)]);
    }

    /// Checks that the users collection is reachable.
    ///
    /// # Errors
    /// Returns a string describing the failure if the database is unreachable.
    pub async fn check_database(&self) -> Result<(), String> {
        let db_timeout = Duration::from_millis(self.config.database_timeout_ms);

        let result = match timeout(db_timeout, self.users.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Database check failed: {e}")),
            Err(_) => Err("Database check timed out".to_string()),
        };
        self.record("database", result.is_ok());
        result
    }

    /// Checks that an access token can be obtained.
    ///
    /// # Errors
    /// Returns a string describing the failure if credentials are unavailable.
    pub async fn check_credentials(&self) -> Result<(), String> {
        let credentials_timeout = Duration::from_millis(self.config.credentials_timeout_ms);

        let result = match timeout(credentials_timeout, self.firebase.check_credentials()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Credentials check failed: {e}")),
            Err(_) => Err("Credentials check timed out".to_string()),
        };
        self.record("credentials", result.is_ok());
        result
    }
}
