use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{MAX_RAW_ERROR_CHARS, StoreError, clip},
    models::Fields,
    services::credentials::GoogleAuth,
};

// documents.list page size; the client keeps paging until the set is complete
const PAGE_SIZE: &str = "300";

/// Document database operations used by the panel.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document with a store-assigned id and returns that id once
    /// the write is acknowledged.
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Fetches every document in the collection.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Fields>, StoreError>;
}

#[derive(Serialize)]
struct WriteBody {
    fields: Fields,
}

#[derive(Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct GoogleErrorBody {
    pub error: GoogleError,
}

#[derive(Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Reads the `{"error": {...}}` envelope Google APIs return, falling back to
/// the raw body.
pub(crate) async fn error_message(res: Response) -> (StatusCode, String) {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GoogleErrorBody>(&body) {
        Ok(b) => match b.error.status {
            Some(s) => format!("{s}: {}", b.error.message),
            None => b.error.message,
        },
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => clip(&body, MAX_RAW_ERROR_CHARS),
    };
    (status, message)
}

/// Firestore over its REST interface.
#[derive(Clone)]
pub struct FirestoreClient {
    auth: GoogleAuth,
    base_url: String,
}

impl FirestoreClient {
    pub fn new(auth: GoogleAuth, base_url: impl Into<String>) -> Self {
        Self {
            auth,
            base_url: base_url.into(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url,
            self.auth.project_id(),
            collection
        )
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let token = self.auth.access_token().await?;

        let res = self
            .auth
            .http()
            .post(self.collection_url(collection))
            .bearer_auth(token)
            .json(&WriteBody { fields })
            .send()
            .await?;

        if !res.status().is_success() {
            let (status, message) = error_message(res).await;
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let doc = res.json::<Document>().await?;
        let id = doc
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("document name without id: {}", doc.name)))?
            .to_string();

        tracing::info!(collection, %id, "document created");
        Ok(id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Fields>, StoreError> {
        let url = self.collection_url(collection);
        let mut items: Vec<Fields> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.auth.access_token().await?;

            let mut req = self
                .auth
                .http()
                .get(&url)
                .bearer_auth(token)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(pt) = &page_token {
                req = req.query(&[("pageToken", pt.as_str())]);
            }

            let res = req.send().await?;
            if !res.status().is_success() {
                let (status, message) = error_message(res).await;
                return Err(StoreError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            let page = res.json::<ListResponse>().await?;
            items.extend(page.documents.into_iter().map(|d| d.fields));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(collection, count = items.len(), "documents listed");
        Ok(items)
    }
}
