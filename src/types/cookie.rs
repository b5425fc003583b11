use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Id of the only cookie store the bridge exposes.
pub const DEFAULT_STORE_ID: &str = "0";

/// A cookie as held by the session cookie store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub session: bool,
    pub expiration_date: Option<f64>,
    pub same_site: String,
}

/// A cookie in the shape extensions expect from `chrome.cookies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
    pub same_site: String,
    pub store_id: String,
}

impl From<Cookie> for CookieRecord {
    fn from(cookie: Cookie) -> Self {
        Self {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            host_only: cookie.host_only,
            path: cookie.path,
            secure: cookie.secure,
            http_only: cookie.http_only,
            session: cookie.session,
            expiration_date: cookie.expiration_date,
            same_site: cookie.same_site,
            store_id: DEFAULT_STORE_ID.to_string(),
        }
    }
}

/// Filter used by store reads. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieFilter {
    pub url: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: Option<bool>,
    pub session: Option<bool>,
}

/// `chrome.cookies.Details`: identifies one cookie by url and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieDetails {
    pub url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

/// `chrome.cookies.SetDetails`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookieDetails {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub http_only: Option<bool>,
    #[serde(default)]
    pub expiration_date: Option<f64>,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl Cookie {
    /// Filter selecting the row this cookie occupies: the store keys
    /// cookies on `(name, domain, path)`.
    pub fn key_filter(&self) -> CookieFilter {
        CookieFilter {
            name: Some(self.name.clone()),
            domain: Some(self.domain.clone()),
            path: Some(self.path.clone()),
            ..Default::default()
        }
    }
}

/// `chrome.cookies.CookieStore`, computed on demand from live tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieStoreDescriptor {
    pub id: String,
    pub tab_ids: Vec<TabId>,
}
