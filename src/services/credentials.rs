use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AuthError, ConfigError, MAX_RAW_ERROR_CHARS, clip};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str =
    "https://www.googleapis.com/auth/datastore https://www.googleapis.com/auth/firebase.messaging";
// refresh this long before the provider's stated expiry
const EXPIRY_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Longest lifetime honoured for a fetched access token.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

/// Service account key file contents.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

// keeps the private key out of logs
impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// Authenticated handle to the provider, shared by the store and messaging
/// clients for the lifetime of the process.
#[derive(Clone)]
pub struct GoogleAuth {
    http: Client,
    account: Arc<ServiceAccount>,
    key: EncodingKey,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

impl GoogleAuth {
    /// Fails when the private key is not a usable RSA PEM.
    pub fn new(http: Client, account: ServiceAccount) -> Result<Self, ConfigError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(ConfigError::PrivateKey)?;

        Ok(Self {
            http,
            account: Arc::new(account),
            key,
            cache: Arc::new(Mutex::new(None)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Returns a bearer token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let fetched = self.exchange().await?;
        let value = fetched.value.clone();
        *cache = Some(fetched);
        Ok(value)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: SCOPES,
            aud: &self.account.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();

        Ok(encode(&header, &claims, &self.key)?)
    }

    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        let res = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(desc) => format!("{}: {desc}", e.error),
                    None => e.error,
                },
                Err(_) => clip(&body, MAX_RAW_ERROR_CHARS),
            };
            tracing::error!(status, %message, "token exchange rejected");
            return Err(AuthError::Rejected { status, message });
        }

        let token = res.json::<TokenResponse>().await?;
        tracing::debug!(expires_in = token.expires_in, "obtained access token");

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: refresh_at(now, token.expires_in),
        })
    }
}

/// When a token issued at `now` stops being served from the cache. Out of range
/// lifetimes resolve to `now`, so the next call exchanges again.
fn refresh_at(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let usable = expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS) - EXPIRY_MARGIN_SECS;
    Duration::try_seconds(usable.max(0))
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};

    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");

    #[test]
    fn debug_hides_private_key() {
        let account = ServiceAccount::from_json(FIXTURE).unwrap();
        let shown = format!("{account:?}");
        assert!(shown.contains("bills-admin-test"));
        assert!(!shown.contains("PRIVATE KEY"));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = ServiceAccount::from_json(r#"{"project_id": "p"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedCredentials(_)));
    }

    #[test]
    fn token_uri_defaults_to_google() {
        let account = ServiceAccount::from_json(
            r#"{"project_id": "p", "client_email": "a@p.iam", "private_key": "x"}"#,
        )
        .unwrap();
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn garbage_private_key_is_rejected() {
        let account = ServiceAccount::from_json(
            r#"{"project_id": "p", "client_email": "a@p.iam", "private_key": "not a pem"}"#,
        )
        .unwrap();
        let err = GoogleAuth::new(Client::new(), account).err().unwrap();
        assert!(matches!(err, ConfigError::PrivateKey(_)));
    }

    #[test]
    fn refresh_is_bounded_for_any_lifetime() {
        let now = Utc::now();
        assert_eq!(refresh_at(now, 3599), now + Duration::seconds(3539));
        assert_eq!(refresh_at(now, 30), now);
        assert_eq!(refresh_at(now, -5), now);
        assert_eq!(refresh_at(now, i64::MIN), now);
        assert_eq!(
            refresh_at(now, i64::MAX),
            now + Duration::seconds(MAX_TOKEN_LIFETIME_SECS - EXPIRY_MARGIN_SECS)
        );
    }

    #[test]
    fn assertion_is_rs256_with_kid_and_scopes() {
        let account = ServiceAccount::from_json(FIXTURE).unwrap();
        let auth = GoogleAuth::new(Client::new(), account).unwrap();

        let jwt = auth.assertion(Utc::now()).unwrap();
        let header = decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

        // signature is not checked here, only the claim set
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        let data = decode::<serde_json::Value>(&jwt, &DecodingKey::from_secret(&[]), &validation)
            .unwrap();
        assert_eq!(
            data.claims["iss"],
            "admin-panel@bills-admin-test.iam.gserviceaccount.com"
        );
        assert!(data.claims["scope"].as_str().unwrap().contains("firebase.messaging"));
    }
}
