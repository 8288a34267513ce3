use super::*;

use std::{
    env, fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(label: &str, contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("dashboard_config_{label}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(SETTINGS_FILE);
    fs::write(&path, contents).expect("write settings");
    path
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/dashboard.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "127.0.0.1:8501");
    assert_eq!(settings.page_size, 10);
    assert_eq!(settings.auto_refresh(), Duration::from_secs(30));
    assert_eq!(settings.max_upload_bytes, 10 * 1024 * 1024);
}

#[test]
fn file_values_are_read_including_bare_numbers() {
    let path = temp_settings_file(
        "file_values",
        r#"
bind_addr = "0.0.0.0:9000"
default_sheet_url = "https://docs.google.com/spreadsheets/d/abc/edit"
page_size = 25
chat_timeout_secs = "5"
"#,
    );
    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(
        settings.default_sheet_url,
        "https://docs.google.com/spreadsheets/d/abc/edit"
    );
    assert_eq!(settings.page_size, 25);
    assert_eq!(settings.webhook_config().chat_timeout, Duration::from_secs(5));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn env_overrides_file() {
    let path = temp_settings_file("env_overrides", "bind_addr = \"0.0.0.0:9000\"\nwebhook_user = \"file\"\n");
    let settings = load_settings_from(
        &path,
        env_from(&[
            ("DASHBOARD_BIND", "127.0.0.1:1"),
            ("APP__BIND_ADDR", "127.0.0.1:2"),
            ("APP__WEBHOOK_USER", "ops"),
            ("APP__IMAGE_WEBHOOK_URL", "http://hooks.local/image"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.webhook_user, "ops");
    assert_eq!(settings.webhook_config().image_url, "http://hooks.local/image");

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn invalid_numbers_keep_previous_value() {
    let settings = load_settings_from(
        Path::new("/nonexistent/dashboard.toml"),
        env_from(&[("APP__PAGE_SIZE", "lots"), ("APP__SESSION_IDLE_SECS", " 60 ")]),
    );
    assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(settings.session_idle(), Duration::from_secs(60));
}

#[test]
fn zero_values_keep_previous_value() {
    let path = temp_settings_file("zero_values", "session_idle_secs = 0\nchat_timeout_secs = 0\n");
    let settings = load_settings_from(
        &path,
        env_from(&[("APP__AUTO_REFRESH_SECS", "0"), ("APP__PAGE_SIZE", "0")]),
    );
    assert_eq!(settings.auto_refresh(), Duration::from_secs(30));
    assert_eq!(settings.session_idle(), Duration::from_secs(3600));
    assert_eq!(settings.webhook_config().chat_timeout, Duration::from_secs(30));
    assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let path = temp_settings_file("malformed", "this is = = not toml");
    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings, Settings::default());

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}
