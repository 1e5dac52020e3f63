use super::*;
use tempfile::TempDir;

#[test]
fn test_default_config_path_is_yaml_under_skiff() {
    if let Some(path) = get_default_config_path() {
        assert!(path.ends_with("skiff/config.yaml"));
    }
}

#[test]
fn test_cli_path_wins() {
    let path = resolve_config_path_from(
        Some(Path::new("/etc/skiff.yaml")),
        Some(PathBuf::from("/home/user/.config/skiff/config.yaml")),
    );
    assert_eq!(path, Some(PathBuf::from("/etc/skiff.yaml")));
}

#[test]
fn test_cli_path_returned_even_if_missing() {
    let path = resolve_config_path_from(Some(Path::new("/nonexistent/skiff.yaml")), None);
    assert_eq!(path, Some(PathBuf::from("/nonexistent/skiff.yaml")));
}

#[test]
fn test_existing_default_path_is_used() {
    let dir = TempDir::new().unwrap();
    let default = dir.path().join("config.yaml");
    std::fs::write(&default, "reference:\n  default_tag: stable\n").unwrap();

    assert_eq!(resolve_config_path_from(None, Some(default.clone())), Some(default));
}

#[test]
fn test_missing_default_path_is_skipped() {
    let dir = TempDir::new().unwrap();
    let default = dir.path().join("config.yaml");

    assert_eq!(resolve_config_path_from(None, Some(default)), None);
}

#[test]
fn test_no_default_location() {
    assert_eq!(resolve_config_path_from(None, None), None);
}
