use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub firebase: FirebaseConfig,

    #[command(flatten)]
    pub notifications: NotificationConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "NOTIFIER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for trigger deliveries
    #[arg(long, env = "NOTIFIER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Port for the management server (health probes)
    #[arg(long, env = "NOTIFIER_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Maximum time a single trigger invocation may run
    #[arg(long, env = "NOTIFIER_INVOCATION_TIMEOUT_SECS", default_value_t = 60)]
    pub invocation_timeout_secs: u64,

    /// How long to wait for in-flight invocations on shutdown
    #[arg(long, env = "NOTIFIER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CredentialKind {
    /// Send requests without an Authorization header (local emulators)
    None,
    /// Use the token given in `--access-token`
    Static,
    /// Fetch tokens from the platform metadata server
    #[default]
    Metadata,
}

#[derive(Clone, Debug, Args)]
pub struct FirebaseConfig {
    /// Firebase project identifier
    #[arg(long, env = "NOTIFIER_PROJECT_ID")]
    pub project_id: String,

    /// Realtime Database base URL (e.g. https://my-project-default-rtdb.firebaseio.com)
    #[arg(long, env = "NOTIFIER_DATABASE_URL")]
    pub database_url: String,

    /// Path of the users collection
    #[arg(long, env = "NOTIFIER_USERS_PATH", default_value = "/users")]
    pub users_path: String,

    /// Ref template the trigger is registered on; must capture `{uid}`
    #[arg(long, env = "NOTIFIER_TRIGGER_REF", default_value = "/users/{uid}/available")]
    pub trigger_ref: String,

    /// Where access tokens come from
    #[arg(long, env = "NOTIFIER_CREDENTIAL_SOURCE", value_enum, default_value_t = CredentialKind::Metadata)]
    pub credential_source: CredentialKind,

    /// Static OAuth2 access token, used with `--credential-source static`
    #[arg(long, env = "NOTIFIER_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// Base URL of the platform metadata server
    #[arg(long, env = "NOTIFIER_METADATA_URL", default_value = "http://metadata.google.internal")]
    pub metadata_url: String,

    /// Base URL of the FCM HTTP v1 API
    #[arg(long, env = "NOTIFIER_FCM_ENDPOINT", default_value = "https://fcm.googleapis.com")]
    pub fcm_endpoint: String,

    /// Ask FCM to validate messages without delivering them
    #[arg(long, env = "NOTIFIER_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Maximum number of FCM send requests in flight per multicast
    #[arg(long, env = "NOTIFIER_MAX_CONCURRENT_SENDS", default_value_t = 64)]
    pub max_concurrent_sends: usize,
}

#[derive(Clone, Debug, Args)]
pub struct NotificationConfig {
    /// Notification title shown on the device
    #[arg(long = "notification-title", env = "NOTIFIER_NOTIFICATION_TITLE", default_value = "Usuario disponible")]
    pub title: String,

    /// Notification body shown on the device
    #[arg(
        long = "notification-body",
        env = "NOTIFIER_NOTIFICATION_BODY",
        default_value = "Un usuario ha activado disponibilidad. Toca para seguirlo."
    )]
    pub body: String,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database readiness check
    #[arg(long, env = "NOTIFIER_HEALTH_DATABASE_TIMEOUT_MS", default_value_t = 2000)]
    pub database_timeout_ms: u64,

    /// Timeout for the credentials readiness check
    #[arg(long, env = "NOTIFIER_HEALTH_CREDENTIALS_TIMEOUT_MS", default_value_t = 2000)]
    pub credentials_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; telemetry export is disabled when unset
    #[arg(long, env = "NOTIFIER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "NOTIFIER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
