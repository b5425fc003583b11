//! Damecon: tabbed shell hosting Chrome extensions.
//!
//! Entry point for the console demo: drives a shell over the headless
//! surface backend and prints what extensions would observe.

use damecon::app::{Shell, ShellOptions};
use damecon::rpc_handler::handle_method;
use damecon::surface::headless::HeadlessBackend;

use serde_json::{json, Value};

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

async fn call(shell: &mut Shell, method: &str, params: Value) -> Value {
    match handle_method(shell, method, &params).await {
        Ok(v) => v,
        Err(e) => {
            println!("  ✗ {} failed: {}", method, e);
            Value::Null
        }
    }
}

async fn demo(shell: &mut Shell) {
    let mut events = shell.subscribe();

    section("Windows & Tabs");
    let window = shell.open_startup_window();
    shell.run_pending();
    let tabs = call(shell, "tabs.query", json!({ "windowId": window })).await;
    println!("  Window {} opened on {}", window, tabs[0]["url"]);

    let created = call(
        shell,
        "tabs.create",
        json!({ "url": "http://www.dmm.com/netgame/", "active": false }),
    )
    .await;
    println!("  Created background tab: {}", created);
    println!();

    section("Game Extension");
    match shell.register_game_extension("kc3kai") {
        Ok(tab) => println!("  Start page open in tab {}", tab),
        Err(e) => println!("  ✗ {}", e),
    }
    let active = call(shell, "tabs.query", json!({ "active": true })).await;
    println!("  Active tab: {}", active);
    println!();

    section("Cookies");
    let set = call(
        shell,
        "cookies.set",
        json!({ "url": "http://www.dmm.com/", "name": "ckcy", "value": "1", "domain": "dmm.com" }),
    )
    .await;
    println!("  Stored: {}", set);
    let got = call(shell, "cookies.get", json!({ "url": "http://www.dmm.com/netgame/", "name": "ckcy" })).await;
    println!("  Read back: {}", got);
    let stores = call(shell, "cookies.getAllCookieStores", json!({})).await;
    println!("  Stores: {}", stores);
    println!();

    section("Extension Events");
    while let Ok(event) = events.try_recv() {
        println!("  {}", serde_json::to_string(&event).unwrap_or_default());
    }
    println!();

    shell.shutdown().await;
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .init();

    println!();
    println!("  Damecon v{} (demo mode)", env!("CARGO_PKG_VERSION"));
    println!();

    let config = std::env::temp_dir().join("damecon-demo").join("config.json");
    let options = ShellOptions {
        config_path: Some(config.to_string_lossy().into_owned()),
        ..Default::default()
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(async {
        let mut shell = match Shell::new(Box::new(HeadlessBackend::new()), options) {
            Ok(shell) => shell,
            Err(e) => {
                eprintln!("failed to initialize shell: {}", e);
                std::process::exit(1);
            }
        };
        demo(&mut shell).await;
    });
}
