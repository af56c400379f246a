#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bills_admin::{
    AppState,
    config::Settings,
    error::{AuthError, MessagingError, StoreError},
    models::{FieldValue, Fields},
    services::{
        credentials::ServiceAccount,
        fcm::{BatchResponse, Messenger, MulticastMessage, SendResponse},
        firestore::DocumentStore,
    },
    templates,
};
use http_body_util::BodyExt;

pub const FIXTURE: &str = include_str!("../fixtures/service_account.json");

#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
}

#[derive(Default)]
pub struct FakeStore {
    pub docs: Mutex<Vec<StoredDoc>>,
    pub fail_writes: bool,
    pub fail_reads: bool,
    /// Overrides the message of a failed write.
    pub write_error: Option<String>,
}

impl FakeStore {
    pub fn with_tokens(n: usize) -> Self {
        let store = FakeStore::default();
        for i in 0..n {
            store.seed("fcmTokens", token_doc(&format!("token-{i:04}")));
        }
        store
    }

    pub fn seed(&self, collection: &str, fields: Fields) {
        let mut docs = self.docs.lock().unwrap();
        let id = format!("seed-{}", docs.len());
        docs.push(StoredDoc {
            collection: collection.to_string(),
            id,
            fields,
        });
    }

    pub fn in_collection(&self, collection: &str) -> Vec<StoredDoc> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.collection == collection)
            .cloned()
            .collect()
    }
}

pub fn token_doc(token: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("token".into(), FieldValue::String(token.to_string()));
    fields.insert("platform".into(), FieldValue::String("web".into()));
    fields
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        if self.fail_writes {
            return Err(StoreError::Rejected {
                status: 503,
                message: self
                    .write_error
                    .clone()
                    .unwrap_or_else(|| "UNAVAILABLE: quota exhausted".into()),
            });
        }
        let mut docs = self.docs.lock().unwrap();
        let id = format!("bill-{}", docs.len() + 1);
        docs.push(StoredDoc {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        });
        Ok(id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Fields>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Rejected {
                status: 403,
                message: "PERMISSION_DENIED: Missing or insufficient permissions.".into(),
            });
        }
        Ok(self
            .in_collection(collection)
            .into_iter()
            .map(|d| d.fields)
            .collect())
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<MulticastMessage>>,
    pub failing_tokens: HashSet<String>,
    pub failing_batches: HashSet<usize>,
    /// Answers with one response fewer than the batch has tokens.
    pub short_responses: bool,
}

impl FakeMessenger {
    pub fn batches(&self) -> Vec<MulticastMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(|m| m.tokens.len()).collect()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, MessagingError> {
        let index = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len() - 1
        };

        if self.failing_batches.contains(&index) {
            return Err(MessagingError::Auth(AuthError::Rejected {
                status: 500,
                message: "internal error".into(),
            }));
        }

        let answered = if self.short_responses {
            message.tokens.len().saturating_sub(1)
        } else {
            message.tokens.len()
        };

        let responses = message
            .tokens
            .iter()
            .take(answered)
            .map(|t| {
                if self.failing_tokens.contains(t) {
                    SendResponse::Failed {
                        error: "NOT_FOUND: Requested entity was not found.".into(),
                    }
                } else {
                    SendResponse::Sent {
                        message_id: format!("projects/bills-admin-test/messages/{t}"),
                    }
                }
            })
            .collect();

        Ok(BatchResponse { responses })
    }
}

pub fn test_settings() -> Settings {
    Settings::with_service_account(ServiceAccount::from_json(FIXTURE).expect("fixture credentials"))
}

pub fn test_state(
    settings: Settings,
    store: Arc<FakeStore>,
    messenger: Arc<FakeMessenger>,
) -> AppState {
    AppState::new(
        settings,
        templates::build_handlebars().expect("templates"),
        store,
        messenger,
    )
}

pub async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}
