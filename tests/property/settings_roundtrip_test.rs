//! Property-based tests for ShellSettings persistence.
//!
//! Arbitrary settings survive a JSON round-trip, and values written through
//! dot-notation keys read back unchanged from a freshly loaded engine.

use damecon::services::settings_engine::{SettingsEngine, SettingsEngineTrait, CONFIG_FILE_NAME};
use damecon::types::settings::{
    DevtoolsSettings, GameExtensionSettings, ProxyConfig, ProxySettings, ShellSettings,
    UpdateSettings, WindowSettings, WindowState,
};
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn arb_channel() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("release".to_string()),
        Just("master".to_string()),
        Just("develop".to_string()),
        "custom-[a-z]{1,8}",
    ]
}

fn arb_update_settings() -> impl Strategy<Value = UpdateSettings> {
    (arb_channel(), "(startup|daily|never)", any::<bool>()).prop_map(|(channel, schedule, auto)| {
        UpdateSettings {
            channel,
            schedule,
            auto,
        }
    })
}

fn arb_proxy_config() -> impl Strategy<Value = ProxyConfig> {
    ("[a-z0-9.]{1,20}", any::<u16>(), any::<bool>())
        .prop_map(|(host, port, enable)| ProxyConfig { host, port, enable })
}

// debug_shell is left off: an environment flag may force it on at load.
fn arb_settings() -> impl Strategy<Value = ShellSettings> {
    (
        (100u32..4000, 100u32..3000),
        arb_update_settings(),
        arb_proxy_config(),
        any::<bool>(),
    )
        .prop_map(|((width, height), update, client, open_on_start_page)| ShellSettings {
            window: WindowSettings {
                state: WindowState { width, height },
            },
            kc3kai: GameExtensionSettings { update },
            proxy: ProxySettings { client },
            devtools: DevtoolsSettings {
                open_on_start_page,
                debug_shell: false,
            },
        })
}

fn engine_in(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join(CONFIG_FILE_NAME);
    SettingsEngine::new(Some(path.to_string_lossy().to_string()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn settings_json_roundtrip(settings in arb_settings()) {
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: ShellSettings = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded, settings);
    }

    #[test]
    fn dotted_writes_survive_reload(
        width in 100u32..4000,
        port in any::<u16>(),
        channel in arb_channel(),
    ) {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_in(&dir);
        engine.load().unwrap();
        engine.set_value("window.state.width", json!(width)).unwrap();
        engine.set_value("proxy.client.port", json!(port)).unwrap();
        engine.set_value("kc3kai.update.channel", json!(channel.clone())).unwrap();

        let mut reloaded = engine_in(&dir);
        let loaded = reloaded.load().unwrap();
        prop_assert_eq!(loaded.window.state.width, width);
        prop_assert_eq!(loaded.proxy.client.port, port);
        prop_assert_eq!(&loaded.kc3kai.update.channel, &channel);
        prop_assert_eq!(reloaded.get_value("proxy.client.port").unwrap(), json!(port));
    }

    #[test]
    fn rejected_writes_leave_settings_untouched(bogus in "[a-z]{1,12}") {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_in(&dir);
        engine.load().unwrap();
        let before = engine.get_settings().clone();

        prop_assert!(engine.set_value("window.state.height", json!(bogus)).is_err());
        let bogus_key = format!("window.{}x", bogus);
        prop_assert!(engine.set_value(&bogus_key, json!(1)).is_err());
        prop_assert_eq!(engine.get_settings(), &before);
    }
}
