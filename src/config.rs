use std::{env, path::PathBuf};

use crate::{error::ConfigError, services::credentials::ServiceAccount};

pub const DEFAULT_ADDED_BY: &str = "Admin";

/// Which bill values are rejected before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub require_positive_amount: bool,
    pub require_non_negative_units: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            require_positive_amount: true,
            require_non_negative_units: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub service_account: ServiceAccount,
    pub firestore_base_url: String,
    pub fcm_base_url: String,

    pub added_by: String,
    pub validation: ValidationRules,
    pub cookie_secure: bool,
}

impl Settings {
    /// Builds settings with defaults around an already parsed service account.
    pub fn with_service_account(service_account: ServiceAccount) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            service_account,
            firestore_base_url: "https://firestore.googleapis.com".to_string(),
            fcm_base_url: "https://fcm.googleapis.com".to_string(),
            added_by: DEFAULT_ADDED_BY.to_string(),
            validation: ValidationRules::default(),
            cookie_secure: false,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = match lookup("FIREBASE_CREDENTIALS").filter(|s| !s.trim().is_empty()) {
            Some(blob) => blob,
            None => {
                let path = lookup("FIREBASE_CREDENTIALS_PATH")
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
                    .ok_or(ConfigError::MissingCredentials)?;
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::CredentialsFile { path, source })?
            }
        };
        let service_account = ServiceAccount::from_json(&raw)?;

        let mut settings = Self::with_service_account(service_account);

        if let Some(host) = lookup("HOST") {
            settings.host = host;
        }
        if let Some(port) = lookup("PORT") {
            settings.port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidVar { name: "PORT", value: port })?;
        }
        if let Some(url) = lookup("FIRESTORE_BASE_URL") {
            settings.firestore_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("FCM_BASE_URL") {
            settings.fcm_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(added_by) = lookup("BILL_ADDED_BY").filter(|s| !s.trim().is_empty()) {
            settings.added_by = added_by;
        }

        settings.validation.require_positive_amount =
            flag(&lookup, "BILL_REQUIRE_POSITIVE_AMOUNT", true)?;
        settings.validation.require_non_negative_units =
            flag(&lookup, "BILL_REQUIRE_NON_NEGATIVE_UNITS", true)?;
        settings.cookie_secure = flag(&lookup, "COOKIE_SECURE", false)?;

        Ok(settings)
    }
}

fn flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar { name, value }),
    }
}

pub fn load() -> Result<Settings, ConfigError> {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    Settings::from_lookup(|name| env::var(name).ok())
}
