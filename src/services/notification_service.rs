use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::StoreError,
    models::DeviceToken,
    services::{
        fcm::{
            MAX_MULTICAST_TOKENS, Messenger, MulticastMessage, Notification, SendResponse,
            WebpushNotification,
        },
        firestore::DocumentStore,
    },
};

pub const TOKENS_COLLECTION: &str = "fcmTokens";
pub const NOTIFICATION_ICON: &str = "/icons/Icon-192.png";
pub const NOTIFICATION_TAG: &str = "electricity-bill";
pub const NEW_BILL_TYPE: &str = "new_bill";

/// Result of reading the registered device tokens.
#[derive(Debug)]
pub enum TokenFetch {
    Tokens(Vec<String>),
    /// The token collection could not be read; treated as nothing to notify.
    Unavailable(StoreError),
}

impl TokenFetch {
    pub fn into_tokens(self) -> Vec<String> {
        match self {
            TokenFetch::Tokens(t) => t,
            TokenFetch::Unavailable(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Delivered { size: usize, success: usize, failure: usize },
    Failed { size: usize, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecipient {
    pub token: String,
    pub error: String,
}

/// What a broadcast did. Never an error: delivery is best effort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub token_count: usize,
    pub tokens_unavailable: bool,
    pub batches: Vec<BatchOutcome>,
    pub failed_recipients: Vec<FailedRecipient>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.batches
            .iter()
            .map(|b| match b {
                BatchOutcome::Delivered { success, .. } => *success,
                BatchOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Broadcasts a notification to every registered device, in batches.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn DocumentStore>,
    messenger: Arc<dyn Messenger>,
    batch_size: usize,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            messenger,
            batch_size: MAX_MULTICAST_TOKENS,
        }
    }

    pub async fn fetch_tokens(&self) -> TokenFetch {
        match self.store.list_documents(TOKENS_COLLECTION).await {
            Ok(docs) => {
                let tokens: Vec<String> = docs
                    .iter()
                    .filter_map(DeviceToken::from_fields)
                    .map(|t| t.0)
                    .collect();
                tracing::info!(count = tokens.len(), "retrieved device tokens");
                TokenFetch::Tokens(tokens)
            }
            Err(e) => {
                tracing::error!(error = %e, "could not read device tokens; skipping notifications");
                TokenFetch::Unavailable(e)
            }
        }
    }

    pub async fn notify_all(&self, title: &str, body: &str, month: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        let tokens = match self.fetch_tokens().await {
            TokenFetch::Tokens(t) => t,
            unavailable => {
                report.tokens_unavailable = true;
                unavailable.into_tokens()
            }
        };
        report.token_count = tokens.len();

        if tokens.is_empty() {
            tracing::warn!("no device tokens found; skipping notifications");
            return report;
        }

        for (index, batch) in tokens.chunks(self.batch_size).enumerate() {
            let message = build_message(batch, title, body, month);

            match self.messenger.send_multicast(&message).await {
                Ok(response) => {
                    let success = response.success_count();
                    let failure = response.failure_count();
                    tracing::info!(batch = index, success, failure, "multicast sent");

                    if response.responses.len() != batch.len() {
                        tracing::warn!(
                            batch = index,
                            tokens = batch.len(),
                            responses = response.responses.len(),
                            "multicast response does not match batch size"
                        );
                    }

                    for (token, r) in batch.iter().zip(&response.responses) {
                        if let SendResponse::Failed { error } = r {
                            tracing::warn!(%token, %error, "push delivery failed");
                            report.failed_recipients.push(FailedRecipient {
                                token: token.clone(),
                                error: error.clone(),
                            });
                        }
                    }

                    report.batches.push(BatchOutcome::Delivered {
                        size: batch.len(),
                        success,
                        failure,
                    });
                }
                Err(e) => {
                    tracing::error!(batch = index, size = batch.len(), error = %e, "multicast failed");
                    report.batches.push(BatchOutcome::Failed {
                        size: batch.len(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

fn build_message(tokens: &[String], title: &str, body: &str, month: &str) -> MulticastMessage {
    MulticastMessage {
        tokens: tokens.to_vec(),
        notification: Notification {
            title: title.to_string(),
            body: body.to_string(),
        },
        webpush: WebpushNotification {
            title: title.to_string(),
            body: body.to_string(),
            icon: NOTIFICATION_ICON.to_string(),
            tag: NOTIFICATION_TAG.to_string(),
            require_interaction: false,
        },
        data: BTreeMap::from([
            ("month".to_string(), month.to_string()),
            ("type".to_string(), NEW_BILL_TYPE.to_string()),
        ]),
    }
}
