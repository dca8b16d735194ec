use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_and_explicit_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("sqlite://./data/x.db"),
        "sqlite://./data/x.db"
    );
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[test]
fn missing_settings_file_yields_defaults() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_with(&temp_root.path().join("absent.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn settings_file_then_env_overrides() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let file = temp_root.path().join("dashboard.toml");
    fs::write(
        &file,
        r#"
bind_addr = "0.0.0.0:9000"
database_url = "sqlite://./file.db"
upload_dir = "media"
max_upload_bytes = 1024
"#,
    )
    .expect("write settings");

    let settings = load_settings_with(
        &file,
        env_from(&[
            ("DATABASE_URL", "sqlite://./legacy.db"),
            ("APP__DATABASE_URL", "sqlite://./app.db"),
            ("APP__MAX_UPLOAD_BYTES", "not-a-number"),
            ("APP__ALLOWED_ORIGIN", "http://dash.local"),
        ]),
    );

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.database_url, "sqlite://./app.db");
    assert_eq!(settings.upload_dir, PathBuf::from("media"));
    assert_eq!(settings.max_upload_bytes, 1024);
    assert_eq!(settings.allowed_origin, "http://dash.local");
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
