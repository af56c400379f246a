use std::path::PathBuf;

/// Longest raw provider body kept in an error message.
pub const MAX_RAW_ERROR_CHARS: usize = 200;

/// Fatal startup failures. The process does not serve requests after one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credentials: set FIREBASE_CREDENTIALS (or FIREBASE_CREDENTIALS_PATH)")]
    MissingCredentials,
    #[error("could not read credentials file {path}: {source}")]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed credentials: {0}")]
    MalformedCredentials(#[from] serde_json::Error),
    #[error("invalid service account private key: {0}")]
    PrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// OAuth2 token exchange failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not sign token assertion: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint rejected credentials ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("document store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected document store response: {0}")]
    Decode(String),
}

/// A whole multicast batch failed. Per-recipient failures are not errors; they
/// are carried in the batch response.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("messaging service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("batch of {size} tokens exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}
