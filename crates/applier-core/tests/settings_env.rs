use std::{env, fs};

use applier_core::settings::loader::load_settings;

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("applier.toml");
    fs::write(
        &path,
        r#"
[remote]
api_username = "applier"
timeout_ms = 1000
"#,
    )
    .expect("write toml");

    let settings = load_settings(Some(&path)).expect("should parse settings");
    assert_eq!(settings.remote.timeout_ms, 1000);
    assert_eq!(settings.remote.api_username, "applier");

    unsafe {
        env::set_var("APPLIER__REMOTE__TIMEOUT_MS", "2500");
    }
    let overridden = load_settings(Some(&path)).expect("should parse with env overrides");
    unsafe {
        env::remove_var("APPLIER__REMOTE__TIMEOUT_MS");
    }

    assert_eq!(overridden.remote.timeout_ms, 2500);
    assert_eq!(overridden.remote.api_username, "applier");
}
