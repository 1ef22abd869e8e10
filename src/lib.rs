#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::database::{RealtimeDbRepository, UserRepository};
use crate::adapters::firebase::FirebaseApp;
use crate::adapters::push::{FcmPushProvider, PushProvider};
use crate::api::{AppState, MgmtState};
use crate::config::Config;
use crate::domain::change::{RefTemplate, TemplateError};
use crate::services::availability_service::AvailabilityService;
use crate::services::health_service::HealthService;
use std::sync::Arc;
use tokio::sync::watch;

/// Fully wired application state, ready to be mounted on routers.
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub mgmt: MgmtState,
}

/// Wires the Firebase handle, adapters and services together.
///
/// The Firebase handle is initialized exactly once here. Collaborators can be replaced
/// before `build` (tests use this to substitute fakes).
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    firebase: Option<Arc<FirebaseApp>>,
    users: Option<Arc<dyn UserRepository>>,
    push: Option<Arc<dyn PushProvider>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, firebase: None, users: None, push: None }
    }

    #[must_use]
    pub fn with_firebase(mut self, firebase: Arc<FirebaseApp>) -> Self {
        self.firebase = Some(firebase);
        self
    }

    #[must_use]
    pub fn with_user_repository(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    #[must_use]
    pub fn with_push_provider(mut self, push: Arc<dyn PushProvider>) -> Self {
        self.push = Some(push);
        self
    }

    /// Builds the application.
    ///
    /// # Errors
    /// Returns an error if the trigger template is invalid or does not capture `{uid}`,
    /// or if the Firebase handle cannot be initialized.
    pub fn build(self) -> anyhow::Result<App> {
        let trigger_ref = RefTemplate::parse(&self.config.firebase.trigger_ref)?;
        if !trigger_ref.has_param("uid") {
            return Err(TemplateError::MissingParam("uid").into());
        }

        let firebase = match self.firebase {
            Some(firebase) => firebase,
            None => FirebaseApp::initialize(&self.config.firebase)?,
        };

        let users: Arc<dyn UserRepository> = match self.users {
            Some(users) => users,
            None => Arc::new(RealtimeDbRepository::new(Arc::clone(&firebase), &self.config.firebase.users_path)),
        };
        let push: Arc<dyn PushProvider> = match self.push {
            Some(push) => push,
            None => Arc::new(FcmPushProvider::new(
                Arc::clone(&firebase),
                self.config.firebase.dry_run,
                self.config.firebase.max_concurrent_sends,
            )),
        };

        let availability_service = AvailabilityService::new(Arc::clone(&users), push, self.config.notifications);
        let health_service = HealthService::new(users, firebase, self.config.health);

        tracing::info!(trigger = %trigger_ref, "Availability trigger registered");

        Ok(App { state: AppState { availability_service, trigger_ref }, mgmt: MgmtState { health_service } })
    }
}

/// Routes panics through tracing so they reach structured logs.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();

        tracing::error!(panic.location = %location, panic.payload = %payload, "Panic occurred");
    }));
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        let _ = shutdown_tx.send(true);
    });
}
