//! One-shot messages carried to the next rendered page in a signed cookie.

use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::{Deserialize, Serialize};

const FLASH_COOKIE: &str = "_flash";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub category: Category,
    pub message: String,
}

// hex keeps the JSON clear of characters cookies don't allow
fn read(jar: &SignedCookieJar) -> Vec<Flash> {
    jar.get(FLASH_COOKIE)
        .and_then(|c| hex::decode(c.value()).ok())
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

pub fn push(
    jar: SignedCookieJar,
    category: Category,
    message: impl Into<String>,
) -> SignedCookieJar {
    let mut flashes = read(&jar);
    flashes.push(Flash {
        category,
        message: message.into(),
    });
    let value = serde_json::to_vec(&flashes)
        .map(hex::encode)
        .unwrap_or_default();

    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Drains the pending messages.
pub fn take(jar: SignedCookieJar) -> (SignedCookieJar, Vec<Flash>) {
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, Vec::new());
    }
    let flashes = read(&jar);
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flashes)
}
