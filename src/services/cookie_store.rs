// Damecon Cookie Store
// The session cookie jar behind chrome.cookies. Reads match RFC 6265
// domain/path rules against a URL; writes upsert on (name, domain, path).

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Row};
use url::Url;

use crate::database::Database;
use crate::types::cookie::{Cookie, CookieFilter, SetCookieDetails};
use crate::types::errors::CookieError;

const DEFAULT_SAME_SITE: &str = "unspecified";

/// Asynchronous cookie jar of one browsing session.
///
/// Results are always in insertion order, so "first match" is well defined.
#[async_trait(?Send)]
pub trait CookieStore {
    /// Every unexpired cookie matching all populated fields of `filter`.
    async fn get(&self, filter: &CookieFilter) -> Result<Vec<Cookie>, CookieError>;
    /// Creates or overwrites the cookie described by `details`.
    async fn set(&self, details: &SetCookieDetails) -> Result<(), CookieError>;
    /// Deletes every cookie named `name` that would be sent to `url`.
    async fn remove(&self, url: &str, name: &str) -> Result<(), CookieError>;
}

/// [`CookieStore`] backed by the SQLite `cookies` table.
pub struct SqliteCookieStore {
    db: Database,
}

impl SqliteCookieStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// A store that forgets everything when dropped.
    pub fn in_memory() -> Result<Self, CookieError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn select(&self, filter: &CookieFilter) -> Result<Vec<(i64, Cookie)>, CookieError> {
        let target = filter.url.as_deref().map(parse_url).transpose()?;
        let now = now_secs();

        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, value, domain, host_only, path, secure, http_only, expiration_date, same_site
             FROM cookies ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_cookie)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, cookie) = row?;
            if cookie.expiration_date.is_some_and(|exp| exp <= now) {
                continue;
            }
            if let Some(url) = &target {
                if !matches_url(&cookie, url) {
                    continue;
                }
            }
            if matches_fields(&cookie, filter) {
                out.push((id, cookie));
            }
        }
        Ok(out)
    }
}

fn row_to_cookie(row: &Row<'_>) -> rusqlite::Result<(i64, Cookie)> {
    let expiration_date: Option<f64> = row.get(8)?;
    Ok((
        row.get(0)?,
        Cookie {
            name: row.get(1)?,
            value: row.get(2)?,
            domain: row.get(3)?,
            host_only: row.get(4)?,
            path: row.get(5)?,
            secure: row.get(6)?,
            http_only: row.get(7)?,
            session: expiration_date.is_none(),
            expiration_date,
            same_site: row.get(9)?,
        },
    ))
}

#[async_trait(?Send)]
impl CookieStore for SqliteCookieStore {
    async fn get(&self, filter: &CookieFilter) -> Result<Vec<Cookie>, CookieError> {
        Ok(self.select(filter)?.into_iter().map(|(_, c)| c).collect())
    }

    async fn set(&self, details: &SetCookieDetails) -> Result<(), CookieError> {
        let cookie = normalize(details)?;
        self.db.connection().execute(
            "INSERT INTO cookies (name, value, domain, host_only, path, secure, http_only, expiration_date, same_site)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(name, domain, path) DO UPDATE SET
                 value = excluded.value,
                 host_only = excluded.host_only,
                 secure = excluded.secure,
                 http_only = excluded.http_only,
                 expiration_date = excluded.expiration_date,
                 same_site = excluded.same_site",
            params![
                cookie.name,
                cookie.value,
                cookie.domain,
                cookie.host_only,
                cookie.path,
                cookie.secure,
                cookie.http_only,
                cookie.expiration_date,
                cookie.same_site,
            ],
        )?;
        tracing::debug!(name = %cookie.name, domain = %cookie.domain, "cookie stored");
        Ok(())
    }

    async fn remove(&self, url: &str, name: &str) -> Result<(), CookieError> {
        let filter = CookieFilter {
            url: Some(url.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        };
        let doomed = self.select(&filter)?;
        let conn = self.db.connection();
        for (id, _) in doomed {
            conn.execute("DELETE FROM cookies WHERE id = ?1", params![id])?;
        }
        Ok(())
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn parse_url(raw: &str) -> Result<Url, CookieError> {
    let url = Url::parse(raw).map_err(|e| CookieError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.host_str().is_none() {
        return Err(CookieError::InvalidUrl(format!("{}: missing host", raw)));
    }
    Ok(url)
}

/// Builds the stored form of a cookie from `chrome.cookies.set` details.
pub fn normalize(details: &SetCookieDetails) -> Result<Cookie, CookieError> {
    let url = parse_url(&details.url)?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    let (domain, host_only) = match details.domain.as_deref().filter(|d| !d.is_empty()) {
        Some(d) if d.starts_with('.') => (d.to_ascii_lowercase(), false),
        Some(d) => (format!(".{}", d.to_ascii_lowercase()), false),
        None => (host, true),
    };

    let path = match details.path.as_deref().filter(|p| p.starts_with('/')) {
        Some(p) => p.to_string(),
        None => default_path(url.path()),
    };

    Ok(Cookie {
        name: details.name.clone().unwrap_or_default(),
        value: details.value.clone().unwrap_or_default(),
        domain,
        host_only,
        path,
        secure: details.secure.unwrap_or(false),
        http_only: details.http_only.unwrap_or(false),
        session: details.expiration_date.is_none(),
        expiration_date: details.expiration_date,
        same_site: details
            .same_site
            .clone()
            .unwrap_or_else(|| DEFAULT_SAME_SITE.to_string()),
    })
}

/// RFC 6265 §5.1.4 default-path of a request path.
pub fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => request_path[..i].to_string(),
    }
}

fn domain_matches(cookie: &Cookie, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    if cookie.host_only {
        return cookie.domain == host;
    }
    let domain = cookie.domain.trim_start_matches('.');
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// RFC 6265 §5.1.4 path-match.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn matches_url(cookie: &Cookie, url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();
    if !domain_matches(cookie, host) || !path_matches(&cookie.path, url.path()) {
        return false;
    }
    !cookie.secure || url.scheme() == "https"
}

fn matches_fields(cookie: &Cookie, filter: &CookieFilter) -> bool {
    if filter.name.as_ref().is_some_and(|n| *n != cookie.name) {
        return false;
    }
    if let Some(domain) = &filter.domain {
        let wanted = domain.trim_start_matches('.').to_ascii_lowercase();
        let have = cookie.domain.trim_start_matches('.');
        if have != wanted && !have.ends_with(&format!(".{}", wanted)) {
            return false;
        }
    }
    if filter.path.as_ref().is_some_and(|p| *p != cookie.path) {
        return false;
    }
    if filter.secure.is_some_and(|s| s != cookie.secure) {
        return false;
    }
    if filter.session.is_some_and(|s| s != cookie.session) {
        return false;
    }
    true
}
