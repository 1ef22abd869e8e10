use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityData {
    pub tracked_uid: String,
}

/// The payload announcing that a user became available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityNotification {
    pub notification: NotificationContent,
    pub data: AvailabilityData,
}

impl AvailabilityNotification {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>, tracked_uid: impl Into<String>) -> Self {
        Self {
            notification: NotificationContent { title: title.into(), body: body.into() },
            data: AvailabilityData { tracked_uid: tracked_uid.into() },
        }
    }
}

/// Outcome of delivering to one device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    #[must_use]
    pub const fn delivered(message_id: String) -> Self {
        Self { success: true, message_id: Some(message_id), error: None }
    }

    #[must_use]
    pub const fn failed(error: String) -> Self {
        Self { success: false, message_id: None, error: Some(error) }
    }
}

/// Aggregated result of one multicast send. `responses` follows the order of the input tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
}

impl FromIterator<SendResponse> for MulticastResponse {
    fn from_iter<I: IntoIterator<Item = SendResponse>>(iter: I) -> Self {
        let responses: Vec<SendResponse> = iter.into_iter().collect();
        let success_count = responses.iter().filter(|r| r.success).count();
        Self { success_count, failure_count: responses.len() - success_count, responses }
    }
}
