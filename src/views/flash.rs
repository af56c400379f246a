use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::error::clip;

pub const FLASH_COOKIE: &str = "flash";
/// Keeps the encoded cookie well under the 4 KB browsers accept.
pub const MAX_FLASH_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

pub fn set(jar: CookieJar, flash: &Flash, secure: bool) -> CookieJar {
    let flash = Flash {
        kind: flash.kind,
        message: clip(&flash.message, MAX_FLASH_CHARS),
    };
    let Ok(value) = serde_json::to_string(&flash) else {
        return jar;
    };

    let mut cookie = Cookie::new(FLASH_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    if secure {
        cookie.set_secure(true);
    }
    jar.add(cookie)
}

/// Reads and clears the pending message. Unreadable cookies are dropped.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = serde_json::from_str::<Flash>(cookie.value()).ok();

    let mut removal = Cookie::from(FLASH_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), flash)
}
