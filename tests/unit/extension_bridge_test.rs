use std::rc::Rc;

use async_trait::async_trait;
use damecon::services::cookie_store::{CookieStore, SqliteCookieStore};
use damecon::services::extension_bridge::{ExtensionBridge, ExtensionHost, SessionRegistry};
use damecon::types::cookie::{
    Cookie, CookieDetails, CookieFilter, CookieStoreDescriptor, SetCookieDetails,
};
use damecon::types::errors::{CookieError, ExtensionError};
use damecon::types::extension::{
    CreateTabDetails, CreateWindowDetails, ExtensionEvent, TabQuery, UpdateTabDetails,
};
use damecon::types::tab::{TabId, TabSnapshot, WindowId};
use damecon::types::window::{WindowNotice, WindowSnapshot};

/// In-memory host: windows hold ordered tab ids plus the active one.
#[derive(Default)]
struct FakeHost {
    windows: Vec<(WindowId, Vec<TabId>, Option<TabId>)>,
    dead: Vec<TabId>,
    next_id: u32,
    loaded: Vec<(TabId, String)>,
    reloaded: Vec<TabId>,
}

impl FakeHost {
    fn with_window(window: WindowId, tabs: &[TabId]) -> Self {
        Self {
            windows: vec![(window, tabs.to_vec(), tabs.first().copied())],
            next_id: 100,
            ..Default::default()
        }
    }

    fn window_mut(&mut self, window: WindowId) -> Result<&mut (WindowId, Vec<TabId>, Option<TabId>), ExtensionError> {
        self.windows
            .iter_mut()
            .find(|w| w.0 == window)
            .ok_or_else(|| ExtensionError::NotFound(format!("window {}", window)))
    }
}

impl ExtensionHost for FakeHost {
    fn create_tab(&mut self, details: &CreateTabDetails) -> Result<(TabId, WindowId), ExtensionError> {
        let window = details.window_id.unwrap_or(self.windows[0].0);
        self.next_id += 1;
        let id = self.next_id;
        let w = self.window_mut(window)?;
        w.1.push(id);
        if details.active != Some(false) {
            w.2 = Some(id);
        }
        Ok((id, window))
    }

    fn select_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError> {
        self.window_mut(window)?.2 = Some(tab);
        Ok(())
    }

    fn deselect_tab(&mut self, window: WindowId) -> Result<(), ExtensionError> {
        self.window_mut(window)?.2 = None;
        Ok(())
    }

    fn remove_tab(&mut self, tab: TabId, window: WindowId) -> Result<(), ExtensionError> {
        self.window_mut(window)?.1.retain(|t| *t != tab);
        self.dead.push(tab);
        Ok(())
    }

    fn create_window(&mut self, _details: &CreateWindowDetails) -> Result<WindowId, ExtensionError> {
        self.next_id += 1;
        self.windows.push((self.next_id, Vec::new(), None));
        Ok(self.next_id)
    }

    fn remove_window(&mut self, window: WindowId) -> Result<(), ExtensionError> {
        self.windows.retain(|w| w.0 != window);
        Ok(())
    }

    fn load_url(&mut self, tab: TabId, _window: WindowId, url: &str) -> Result<(), ExtensionError> {
        self.loaded.push((tab, url.to_string()));
        Ok(())
    }

    fn reload_tab(&mut self, tab: TabId, _window: WindowId) -> Result<(), ExtensionError> {
        self.reloaded.push(tab);
        Ok(())
    }

    fn tab_info(&self, tab: TabId) -> Option<TabSnapshot> {
        if self.dead.contains(&tab) {
            return None;
        }
        self.windows.iter().find_map(|(window, tabs, active)| {
            let index = tabs.iter().position(|t| *t == tab)?;
            Some(TabSnapshot {
                id: tab,
                window_id: *window,
                index,
                active: *active == Some(tab),
                url: Some(format!("https://tab{}.example/", tab)),
                width: 800,
                height: 600,
            })
        })
    }

    fn window_info(&self, window: WindowId) -> Option<WindowSnapshot> {
        self.windows.iter().find(|w| w.0 == window).map(|(id, tabs, active)| WindowSnapshot {
            id: *id,
            focused: *id == self.windows[0].0,
            width: 800,
            height: 600,
            tab_ids: tabs.clone(),
            active_tab: *active,
        })
    }

    fn window_ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(|w| w.0).collect()
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.windows.first().map(|w| w.0)
    }
}

/// Store whose every call fails.
struct BrokenStore;

#[async_trait(?Send)]
impl CookieStore for BrokenStore {
    async fn get(&self, _filter: &CookieFilter) -> Result<Vec<Cookie>, CookieError> {
        Err(CookieError::Store("disk I/O error".to_string()))
    }
    async fn set(&self, _details: &SetCookieDetails) -> Result<(), CookieError> {
        Err(CookieError::Store("disk I/O error".to_string()))
    }
    async fn remove(&self, _url: &str, _name: &str) -> Result<(), CookieError> {
        Err(CookieError::Store("disk I/O error".to_string()))
    }
}

fn bridge_with(store: Rc<dyn CookieStore>) -> ExtensionBridge {
    let mut registry = SessionRegistry::new();
    ExtensionBridge::new(&mut registry, "persist:test", store).unwrap()
}

fn bridge() -> ExtensionBridge {
    bridge_with(Rc::new(SqliteCookieStore::in_memory().unwrap()))
}

fn cookie_details(url: &str, name: &str) -> CookieDetails {
    CookieDetails {
        url: url.to_string(),
        name: name.to_string(),
        store_id: None,
    }
}

// === Session registry ===

#[test]
fn test_second_bridge_for_session_fails() {
    let mut registry = SessionRegistry::new();
    let store: Rc<dyn CookieStore> = Rc::new(SqliteCookieStore::in_memory().unwrap());
    let _first = ExtensionBridge::new(&mut registry, "persist:main", store.clone()).unwrap();
    let second = ExtensionBridge::new(&mut registry, "persist:main", store.clone());
    assert!(matches!(second, Err(ExtensionError::AlreadyRegistered(_))));
    assert!(ExtensionBridge::new(&mut registry, "persist:other", store).is_ok());
}

// === Tab store ===

#[test]
fn test_add_tab_is_idempotent() {
    let mut b = bridge();
    b.add_tab(5, 1);
    b.add_tab(5, 1);
    assert_eq!(b.tracked_tabs(), vec![5]);
    assert_eq!(
        b.take_events(),
        vec![ExtensionEvent::TabCreated { tab_id: 5, window_id: 1 }]
    );
}

#[test]
fn test_select_untracked_tab_is_ignored() {
    let mut b = bridge();
    b.select_tab(5);
    assert!(b.take_events().is_empty());
    assert_eq!(b.active_tab(1), None);
}

#[test]
fn test_notices_drive_tab_store() {
    let mut b = bridge();
    b.window_created(1);
    b.apply_notice(WindowNotice::TabTracked { tab: 5, window: 1 });
    b.apply_notice(WindowNotice::TabActivated { tab: 5, window: 1 });
    assert_eq!(b.active_tab(1), Some(5));
    b.apply_notice(WindowNotice::TabRemoved { tab: 5, window: 1 });
    assert_eq!(b.active_tab(1), None);
    b.apply_notice(WindowNotice::Closed { window: 1 });

    assert_eq!(
        b.take_events(),
        vec![
            ExtensionEvent::WindowCreated { window_id: 1 },
            ExtensionEvent::TabCreated { tab_id: 5, window_id: 1 },
            ExtensionEvent::TabActivated { tab_id: 5, window_id: 1 },
            ExtensionEvent::TabRemoved { tab_id: 5, window_id: 1 },
            ExtensionEvent::WindowRemoved { window_id: 1 },
        ]
    );
}

#[test]
fn test_window_removed_drops_its_tabs() {
    let mut b = bridge();
    b.window_created(1);
    b.add_tab(5, 1);
    b.add_tab(7, 2);
    b.take_events();

    b.window_removed(1);

    assert_eq!(b.tracked_tabs(), vec![7]);
    assert_eq!(
        b.take_events(),
        vec![
            ExtensionEvent::TabRemoved { tab_id: 5, window_id: 1 },
            ExtensionEvent::WindowRemoved { window_id: 1 },
        ]
    );
}

#[test]
fn test_extension_event_wire_format() {
    let json = serde_json::to_value(ExtensionEvent::TabActivated { tab_id: 3, window_id: 1 }).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"event": "tabs.onActivated", "tabId": 3, "windowId": 1})
    );
}

// === chrome.cookies ===

#[tokio::test]
async fn test_cookies_set_returns_stored_cookie() {
    let b = bridge();
    let stored = b
        .cookies_set(&SetCookieDetails {
            url: "http://www.dmm.com/".to_string(),
            name: Some("ckcy".to_string()),
            value: Some("1".to_string()),
            domain: Some("dmm.com".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.domain, ".dmm.com");
    assert_eq!(stored.store_id, "0");

    let got = b.cookies_get(&cookie_details("http://www.dmm.com/netgame/", "ckcy")).await;
    assert_eq!(got.unwrap().value, "1");
}

#[tokio::test]
async fn test_cookies_set_reads_back_defaulted_path() {
    let b = bridge();
    let stored = b
        .cookies_set(&SetCookieDetails {
            url: "http://www.dmm.com/netgame/social/".to_string(),
            name: Some("ckcy".to_string()),
            value: Some("1".to_string()),
            path: Some("kcs2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .expect("the written cookie is returned");
    assert_eq!(stored.path, "/netgame/social");
    assert_eq!(stored.domain, "www.dmm.com");
    assert!(stored.host_only);
}

#[tokio::test]
async fn test_cookies_set_reads_back_off_url_path() {
    let b = bridge();
    let stored = b
        .cookies_set(&SetCookieDetails {
            url: "http://www.dmm.com/".to_string(),
            name: Some("ckcy".to_string()),
            value: Some("1".to_string()),
            domain: Some("dmm.com".to_string()),
            path: Some("/kcs2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.path, "/kcs2");
    assert_eq!(stored.domain, ".dmm.com");
}

#[tokio::test]
async fn test_cookies_get_missing_is_none() {
    let b = bridge();
    assert!(b.cookies_get(&cookie_details("http://a.example/", "nope")).await.is_none());
}

#[tokio::test]
async fn test_cookies_get_all_and_remove() {
    let b = bridge();
    for name in ["a", "b"] {
        b.cookies_set(&SetCookieDetails {
            url: "http://a.example/".to_string(),
            name: Some(name.to_string()),
            value: Some("v".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    }
    let all = b
        .cookies_get_all(&CookieFilter {
            url: Some("http://a.example/".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(all.len(), 2);

    let details = cookie_details("http://a.example/", "a");
    assert_eq!(b.cookies_remove(&details).await, Some(details.clone()));
    assert!(b.cookies_get(&details).await.is_none());
}

#[tokio::test]
async fn test_store_failures_are_swallowed_by_reads() {
    let b = bridge_with(Rc::new(BrokenStore));
    let details = cookie_details("http://a.example/", "k");
    assert!(b.cookies_get(&details).await.is_none());
    assert!(b.cookies_get_all(&CookieFilter::default()).await.is_empty());
    assert_eq!(b.cookies_remove(&details).await, None);

    let err = b
        .cookies_set(&SetCookieDetails {
            url: "http://a.example/".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ExtensionError::Cookie(_)));
}

#[test]
fn test_get_all_cookie_stores_lists_live_tabs() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5, 7, 9]);
    for tab in [5, 7, 9] {
        b.add_tab(tab, 1);
    }
    host.remove_tab(9, 1).unwrap();

    assert_eq!(
        b.cookies_get_all_stores(&host),
        vec![CookieStoreDescriptor {
            id: "0".to_string(),
            tab_ids: vec![5, 7],
        }]
    );
}

// === chrome.tabs ===

#[test]
fn test_tabs_get_unknown_is_not_found() {
    let b = bridge();
    let host = FakeHost::with_window(1, &[5]);
    assert!(matches!(b.tabs_get(&host, 42), Err(ExtensionError::NotFound(_))));
    assert_eq!(b.tabs_get(&host, 5).unwrap().window_id, 1);
}

#[test]
fn test_tabs_query_filters() {
    let b = bridge();
    let mut host = FakeHost::with_window(1, &[5, 7]);
    host.windows.push((2, vec![11], Some(11)));

    assert_eq!(b.tabs_query(&host, &TabQuery::default()).len(), 3);

    let active = b.tabs_query(&host, &TabQuery { active: Some(true), ..Default::default() });
    assert_eq!(active.iter().map(|t| t.id).collect::<Vec<_>>(), vec![5, 11]);

    let current = b.tabs_query(
        &host,
        &TabQuery { current_window: Some(true), ..Default::default() },
    );
    assert_eq!(current.iter().map(|t| t.id).collect::<Vec<_>>(), vec![5, 7]);

    let by_url = b.tabs_query(
        &host,
        &TabQuery { url: Some("https://tab7.example/*".to_string()), ..Default::default() },
    );
    assert_eq!(by_url.len(), 1);
    assert_eq!(by_url[0].id, 7);
}

#[test]
fn test_tabs_create_tracks_new_tab() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5]);
    let tab = b
        .tabs_create(&mut host, &CreateTabDetails { url: Some("https://x/".into()), ..Default::default() })
        .unwrap();
    assert!(b.is_tracked(tab.id));
    assert!(tab.active);
    assert_eq!(
        b.take_events(),
        vec![ExtensionEvent::TabCreated { tab_id: tab.id, window_id: 1 }]
    );
}

#[test]
fn test_tabs_create_in_unknown_window_fails() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5]);
    let err = b
        .tabs_create(&mut host, &CreateTabDetails { window_id: Some(99), ..Default::default() })
        .unwrap_err();
    assert!(matches!(err, ExtensionError::NotFound(_)));
    assert!(b.tracked_tabs().is_empty());
}

#[test]
fn test_tabs_update_loads_and_activates() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5, 7]);
    let updated = b
        .tabs_update(
            &mut host,
            7,
            &UpdateTabDetails { url: Some("https://y/".into()), active: Some(true) },
        )
        .unwrap();
    assert!(updated.active);
    assert_eq!(host.loaded, vec![(7, "https://y/".to_string())]);
}

#[test]
fn test_tabs_remove_and_reload() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5, 7]);
    b.tabs_reload(&mut host, 5).unwrap();
    b.tabs_remove(&mut host, &[5, 7]).unwrap();
    assert_eq!(host.reloaded, vec![5]);
    assert!(host.windows[0].1.is_empty());
    assert!(b.tabs_remove(&mut host, &[5]).is_err());
}

// === chrome.windows ===

#[test]
fn test_windows_get_includes_tabs() {
    let b = bridge();
    let host = FakeHost::with_window(1, &[5, 7]);
    let w = b.windows_get(&host, 1).unwrap();
    assert!(w.focused);
    assert_eq!(w.tabs.unwrap().len(), 2);
    assert!(b.windows_get(&host, 2).is_err());

    let json = serde_json::to_value(b.windows_get_last_focused(&host).unwrap()).unwrap();
    assert_eq!(json["type"], "normal");
    assert_eq!(json["alwaysOnTop"], false);
}

#[test]
fn test_windows_create_and_remove() {
    let mut b = bridge();
    let mut host = FakeHost::with_window(1, &[5]);
    let created = b.windows_create(&mut host, &CreateWindowDetails::default()).unwrap();
    assert_eq!(b.windows_get_all(&host).len(), 2);
    assert_eq!(
        b.take_events(),
        vec![ExtensionEvent::WindowCreated { window_id: created.id }]
    );

    b.windows_remove(&mut host, created.id).unwrap();
    assert_eq!(b.windows_get_all(&host).len(), 1);
    assert!(b.windows_remove(&mut host, created.id).is_err());
}
