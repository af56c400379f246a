use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::{
    error::MessagingError,
    services::{credentials::GoogleAuth, firestore::error_message},
};

/// Provider limit on recipients per multicast.
pub const MAX_MULTICAST_TOKENS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Browser presentation of the notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
    pub require_interaction: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub notification: Notification,
    pub webpush: WebpushNotification,
    pub data: BTreeMap<String, String>,
}

/// Outcome for one recipient, in the same position as its token.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResponse {
    Sent { message_id: String },
    Failed { error: String },
}

impl SendResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, SendResponse::Sent { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends one message to every token of the batch. Per-recipient failures
    /// are reported in the response, not as an error.
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, MessagingError>;
}

#[derive(Serialize)]
struct SendBody<'a> {
    message: WireMessage<'a>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    token: &'a str,
    notification: &'a Notification,
    webpush: WireWebpush<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct WireWebpush<'a> {
    notification: &'a WebpushNotification,
}

#[derive(Deserialize)]
struct SendResult {
    name: String,
}

/// FCM HTTP v1. A multicast is delivered as one `messages:send` per token,
/// issued concurrently within the batch.
#[derive(Clone)]
pub struct FcmClient {
    auth: GoogleAuth,
    base_url: String,
}

impl FcmClient {
    pub fn new(auth: GoogleAuth, base_url: impl Into<String>) -> Self {
        Self {
            auth,
            base_url: base_url.into(),
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url,
            self.auth.project_id()
        )
    }

    async fn send_one(&self, url: &str, bearer: &str, body: &SendBody<'_>) -> SendResponse {
        let res = match self
            .auth
            .http()
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendResponse::Failed { error: e.to_string() },
        };

        if !res.status().is_success() {
            let (_, message) = error_message(res).await;
            return SendResponse::Failed { error: message };
        }

        match res.json::<SendResult>().await {
            Ok(r) => SendResponse::Sent { message_id: r.name },
            Err(e) => SendResponse::Failed { error: e.to_string() },
        }
    }
}

#[async_trait]
impl Messenger for FcmClient {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, MessagingError> {
        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(MessagingError::BatchTooLarge {
                size: message.tokens.len(),
                max: MAX_MULTICAST_TOKENS,
            });
        }

        let bearer = self.auth.access_token().await?;
        let url = self.send_url();

        let bodies: Vec<SendBody<'_>> = message
            .tokens
            .iter()
            .map(|token| SendBody {
                message: WireMessage {
                    token,
                    notification: &message.notification,
                    webpush: WireWebpush {
                        notification: &message.webpush,
                    },
                    data: &message.data,
                },
            })
            .collect();

        let responses = join_all(bodies.iter().map(|b| self.send_one(&url, &bearer, b))).await;

        Ok(BatchResponse { responses })
    }
}
