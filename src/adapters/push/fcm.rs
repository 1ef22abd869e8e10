use crate::adapters::firebase::FirebaseApp;
use crate::adapters::push::{PushError, PushProvider};
use crate::domain::notification::{AvailabilityData, AvailabilityNotification, MulticastResponse, NotificationContent, SendResponse};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: Message<'a>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    validate_only: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    token: &'a str,
    notification: &'a NotificationContent,
    data: &'a AvailabilityData,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

impl ErrorBody {
    fn has_code(&self, code: &str) -> bool {
        self.status == code || self.details.iter().any(|d| d.error_code.as_deref() == Some(code))
    }
}

/// Delivers notifications through the FCM HTTP v1 API, one request per token.
///
/// At most `max_in_flight` requests of a multicast are outstanding at once.
#[derive(Clone, Debug)]
pub struct FcmPushProvider {
    app: Arc<FirebaseApp>,
    send_url: String,
    dry_run: bool,
    max_in_flight: usize,
}

impl FcmPushProvider {
    #[must_use]
    pub fn new(app: Arc<FirebaseApp>, dry_run: bool, max_in_flight: usize) -> Self {
        let send_url = format!("{}/v1/projects/{}/messages:send", app.fcm_endpoint(), app.project_id());
        Self { app, send_url, dry_run, max_in_flight: max_in_flight.max(1) }
    }

    async fn send_one(&self, request: reqwest::RequestBuilder, token: &str, payload: &AvailabilityNotification) -> SendResponse {
        let body = SendRequest {
            message: Message { token, notification: &payload.notification, data: &payload.data },
            validate_only: self.dry_run,
        };

        let response = match request.json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "FCM request failed");
                return SendResponse::failed(format!("transport: {e}"));
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<SendResult>().await {
                Ok(result) => SendResponse::delivered(result.name),
                Err(e) => SendResponse::failed(format!("invalid response: {e}")),
            };
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&text).ok().map(|e| e.error);
        SendResponse::failed(classify_failure(status, detail.as_ref(), &text))
    }
}

fn classify_failure(status: reqwest::StatusCode, detail: Option<&ErrorBody>, raw: &str) -> String {
    let has_code = |code| detail.is_some_and(|d| d.has_code(code));
    if status == reqwest::StatusCode::NOT_FOUND || has_code("UNREGISTERED") {
        "unregistered".to_string()
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || has_code("QUOTA_EXCEEDED") {
        "quota-exceeded".to_string()
    } else {
        let message = detail.map_or(raw, |d| d.message.as_str());
        format!("{status}: {message}")
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    #[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()), err)]
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &AvailabilityNotification,
    ) -> Result<MulticastResponse, PushError> {
        if tokens.is_empty() {
            return Err(PushError::EmptyTokens);
        }

        // Authorize once so every request in the batch shares the same token.
        let template = self.app.authorize(self.app.http().post(&self.send_url)).await?;

        let mut requests = Vec::with_capacity(tokens.len());
        for token in tokens {
            let request = template
                .try_clone()
                .ok_or_else(|| anyhow::anyhow!("FCM request could not be cloned"))?;
            requests.push(self.send_one(request, token, payload));
        }

        // `buffered` keeps results in token order.
        let results: Vec<SendResponse> = stream::iter(requests).buffered(self.max_in_flight).collect().await;
        let response: MulticastResponse = results.into_iter().collect();
        tracing::info!(
            success_count = response.success_count,
            failure_count = response.failure_count,
            dry_run = self.dry_run,
            "FCM multicast completed"
        );
        Ok(response)
    }
}
