use crate::adapters::database::UserRepository;
use crate::adapters::push::PushProvider;
use crate::config::NotificationConfig;
use crate::domain::change::{AvailabilityChange, Transition};
use crate::domain::notification::{AvailabilityNotification, MulticastResponse};
use crate::domain::user::UserSnapshot;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    events: Counter<u64>,
    push_tokens: Counter<u64>,
    failures: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("availability-notifier");
        Self {
            events: meter
                .u64_counter("availability_events_total")
                .with_description("Availability changes handled, by outcome")
                .build(),
            push_tokens: meter
                .u64_counter("availability_push_tokens_total")
                .with_description("Device tokens targeted by availability notifications")
                .build(),
            failures: meter
                .u64_counter("availability_failures_total")
                .with_description("Availability fan-outs abandoned because a collaborator failed")
                .build(),
        }
    }
}

/// Collects the push tokens of every user except `uid`, in snapshot order.
///
/// Tokens are not de-duplicated: two users sharing a device both count.
#[must_use]
pub fn recipient_tokens(snapshot: &UserSnapshot, uid: &str) -> Vec<String> {
    snapshot
        .iter()
        .filter(|(other_uid, _)| *other_uid != uid)
        .filter_map(|(_, record)| record.push_token())
        .map(str::to_owned)
        .collect()
}

/// Reacts to availability changes by notifying every other registered device.
#[derive(Clone, Debug)]
pub struct AvailabilityService {
    users: Arc<dyn UserRepository>,
    push: Arc<dyn PushProvider>,
    config: NotificationConfig,
    metrics: Metrics,
}

impl AvailabilityService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, push: Arc<dyn PushProvider>, config: NotificationConfig) -> Self {
        Self { users, push, config, metrics: Metrics::new() }
    }

    /// Handles one write to a user's availability flag.
    ///
    /// Returns the push service's response when a notification was sent, and `None` for
    /// every other outcome: guard skips, no recipients, or a failed read or send. Failures
    /// are logged here and never surface to the caller.
    #[tracing::instrument(skip(self, change), fields(uid = %change.uid))]
    pub async fn handle(&self, change: &AvailabilityChange) -> Option<MulticastResponse> {
        let transition = change.transition();
        if transition != Transition::BecameAvailable {
            tracing::debug!(reason = transition.as_str(), "Ignoring availability change");
            self.record_outcome(transition.as_str());
            return None;
        }

        match self.fan_out(&change.uid).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Error sending availability notifications");
                None
            }
        }
    }

    async fn fan_out(&self, uid: &str) -> anyhow::Result<Option<MulticastResponse>> {
        let snapshot = self.users.fetch_all().await.inspect_err(|_| self.record_failure("read"))?;

        let tokens = recipient_tokens(&snapshot, uid);
        if tokens.is_empty() {
            tracing::info!(users = snapshot.len(), "No other users with push tokens");
            self.record_outcome("no_recipients");
            return Ok(None);
        }

        let payload = AvailabilityNotification::new(&self.config.title, &self.config.body, uid);
        let response = self.push.send_multicast(&tokens, &payload).await.inspect_err(|_| self.record_failure("send"))?;

        tracing::info!(
            recipients = tokens.len(),
            success_count = response.success_count,
            failure_count = response.failure_count,
            "Availability notification sent"
        );
        self.metrics.push_tokens.add(tokens.len() as u64, &[]);
        self.record_outcome("sent");
        Ok(Some(response))
    }

    fn record_outcome(&self, outcome: &'static str) {
        self.metrics.events.add(1, &[KeyValue::new("outcome", outcome)]);
    }

    fn record_failure(&self, stage: &'static str) {
        self.metrics.failures.add(1, &[KeyValue::new("stage", stage)]);
        self.record_outcome("failed");
    }
}
