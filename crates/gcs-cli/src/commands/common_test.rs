use super::*;
use std::path::Path;

fn global(database: Option<&str>, config: Option<&Path>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        database: database.map(str::to_string),
        config: config.map(Path::to_path_buf),
    }
}

#[test]
fn test_database_flag_wins_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("gcs.yml");
    std::fs::write(&config_path, "database:\n  url: /nonexistent/dir/gcs.duckdb\n").unwrap();

    let global = global(Some(":memory:"), Some(&config_path));
    let config = load_config(&global).unwrap();
    let store = open_store(&global, &config).unwrap();
    assert_eq!(store.target(), &gcs_db::ConnectionTarget::Memory);
}

#[test]
fn test_config_url_used_without_flag() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("gcs.duckdb");
    let config_path = dir.path().join("gcs.yml");
    std::fs::write(
        &config_path,
        format!("database:\n  url: duckdb://{}\n", db_path.display()),
    )
    .unwrap();

    let global = global(None, Some(&config_path));
    let config = load_config(&global).unwrap();
    open_store(&global, &config).unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_missing_url_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("gcs.yml");
    std::fs::write(&config_path, "backup:\n  dir: out\n").unwrap();

    let global = global(None, Some(&config_path));
    let config = load_config(&global).unwrap();
    let err = open_store(&global, &config).unwrap_err();
    assert!(err.to_string().contains("C004"));
}

#[test]
fn test_explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let global = global(None, Some(&dir.path().join("absent.yml")));
    assert!(load_config(&global).is_err());
}
