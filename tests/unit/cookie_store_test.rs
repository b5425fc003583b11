use damecon::database::Database;
use damecon::services::cookie_store::{CookieStore, SqliteCookieStore};
use damecon::types::cookie::{CookieFilter, SetCookieDetails};
use damecon::types::errors::CookieError;
use tempfile::TempDir;

fn store() -> SqliteCookieStore {
    SqliteCookieStore::in_memory().unwrap()
}

fn details(url: &str, name: &str, value: &str) -> SetCookieDetails {
    SetCookieDetails {
        url: url.to_string(),
        name: Some(name.to_string()),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn by_url(url: &str) -> CookieFilter {
    CookieFilter {
        url: Some(url.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_set_then_get_host_only_cookie() {
    let store = store();
    store.set(&details("http://www.dmm.com/netgame/", "ckcy", "1")).await.unwrap();

    let found = store.get(&by_url("http://www.dmm.com/netgame/top")).await.unwrap();
    assert_eq!(found.len(), 1);
    let c = &found[0];
    assert_eq!(c.value, "1");
    assert_eq!(c.domain, "www.dmm.com");
    assert!(c.host_only);
    assert_eq!(c.path, "/netgame");
    assert!(c.session);
    assert_eq!(c.same_site, "unspecified");

    assert!(store.get(&by_url("http://dmm.com/netgame/")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_domain_cookie_matches_subdomains() {
    let store = store();
    let mut d = details("http://www.dmm.com/", "cklg", "ja");
    d.domain = Some("dmm.com".to_string());
    store.set(&d).await.unwrap();

    for url in ["http://dmm.com/", "http://www.dmm.com/", "http://osapi.dmm.com/gadgets"] {
        assert_eq!(store.get(&by_url(url)).await.unwrap().len(), 1, "{}", url);
    }
    assert!(store.get(&by_url("http://notdmm.com/")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_overwrites_same_name_domain_path() {
    let store = store();
    store.set(&details("http://a.example/", "k", "old")).await.unwrap();
    store.set(&details("http://a.example/", "k", "new")).await.unwrap();

    let found = store.get(&by_url("http://a.example/")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value, "new");
}

#[tokio::test]
async fn test_secure_cookie_only_over_https() {
    let store = store();
    let mut d = details("https://a.example/", "s", "1");
    d.secure = Some(true);
    store.set(&d).await.unwrap();

    assert_eq!(store.get(&by_url("https://a.example/")).await.unwrap().len(), 1);
    assert!(store.get(&by_url("http://a.example/")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_cookies_are_skipped() {
    let store = store();
    let mut d = details("http://a.example/", "gone", "1");
    d.expiration_date = Some(1.0);
    store.set(&d).await.unwrap();
    let mut d = details("http://a.example/", "kept", "1");
    d.expiration_date = Some(4_102_444_800.0);
    store.set(&d).await.unwrap();

    let found = store.get(&by_url("http://a.example/")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "kept");
    assert!(!found[0].session);
}

#[tokio::test]
async fn test_get_returns_insertion_order() {
    let store = store();
    for name in ["first", "second", "third"] {
        store.set(&details("http://a.example/", name, "v")).await.unwrap();
    }
    let names: Vec<String> = store
        .get(&CookieFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_field_filters() {
    let store = store();
    store.set(&details("http://a.example/x/y", "k", "1")).await.unwrap();
    store.set(&details("http://b.example/", "k", "2")).await.unwrap();

    let by_name = CookieFilter {
        name: Some("k".to_string()),
        domain: Some("b.example".to_string()),
        ..Default::default()
    };
    let found = store.get(&by_name).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value, "2");

    let by_path = CookieFilter {
        path: Some("/x".to_string()),
        ..Default::default()
    };
    assert_eq!(store.get(&by_path).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_deletes_matching_name_only() {
    let store = store();
    store.set(&details("http://a.example/", "k", "1")).await.unwrap();
    store.set(&details("http://a.example/", "other", "2")).await.unwrap();

    store.remove("http://a.example/", "k").await.unwrap();

    let left = store.get(&by_url("http://a.example/")).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name, "other");
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let store = store();
    let err = store.set(&details("not a url", "k", "v")).await.unwrap_err();
    assert!(matches!(err, CookieError::InvalidUrl(_)));
    assert!(store.get(&by_url("file:///tmp/x")).await.is_err());
}

#[tokio::test]
async fn test_cookies_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.db");
    {
        let store = SqliteCookieStore::new(Database::open(&path).unwrap());
        store.set(&details("http://a.example/", "k", "v")).await.unwrap();
    }
    let store = SqliteCookieStore::new(Database::open(&path).unwrap());
    assert_eq!(store.get(&by_url("http://a.example/")).await.unwrap().len(), 1);
}
