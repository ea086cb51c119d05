use std::path::PathBuf;
use std::time::Duration;

use lantern::config::Config;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.max_connections, None);
    assert_eq!(cfg.server.idle_timeout_secs, None);
    assert_eq!(cfg.server.max_head_size, 64 * 1024);
    assert_eq!(cfg.static_files.root, PathBuf::from("./public"));
    assert_eq!(cfg.static_files.index, "index.html");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml_str(
        r#"
server:
  listen_addr: "0.0.0.0:3000"
  max_connections: 16
  idle_timeout_secs: 5
  log_level: debug
static_files:
  root: /srv/www
  index: home.html
  not_found_page: errors/404.html
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.max_connections, Some(16));
    assert_eq!(cfg.static_files.root, PathBuf::from("/srv/www"));
    assert_eq!(cfg.static_files.index, "home.html");
    assert_eq!(cfg.static_files.not_found_page.as_deref(), Some("errors/404.html"));
    assert_eq!(cfg.log_level().unwrap(), tracing::Level::DEBUG);

    let options = cfg.connection_options();
    assert_eq!(options.idle_timeout, Some(Duration::from_secs(5)));
    assert_eq!(options.max_head_size, 64 * 1024);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("static_files:\n  root: site\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.static_files.root, PathBuf::from("site"));
    assert_eq!(cfg.static_files.index, "index.html");
}

#[test]
fn test_config_rejects_unknown_fields() {
    assert!(Config::from_yaml_str("server:\n  listen: x\n").is_err());
    assert!(Config::from_yaml_str("proxy: {}\n").is_err());
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lantern.yaml");
    std::fs::write(&path, "server:\n  listen_addr: \"127.0.0.1:9000\"\n").unwrap();

    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");

    let err = Config::from_file(dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_config_overrides() {
    let mut cfg = Config::default();

    cfg.apply_overrides(None, None);
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");

    cfg.apply_overrides(Some("0.0.0.0:5000".to_string()), Some("/var/www".to_string()));
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:5000");
    assert_eq!(cfg.static_files.root, PathBuf::from("/var/www"));
}

#[test]
fn test_config_validation_failures() {
    let invalid = [
        "server:\n  listen_addr: \"\"\n",
        "server:\n  max_head_size: 0\n",
        "server:\n  max_connections: 0\n",
        "server:\n  idle_timeout_secs: 0\n",
        "server:\n  log_level: loud\n",
        "static_files:\n  index: \"\"\n",
        "static_files:\n  index: ../index.html\n",
        "static_files:\n  not_found_page: /etc/passwd\n",
        "static_files:\n  bad_request_page: ../../400.html\n",
    ];

    for yaml in invalid {
        let cfg = Config::from_yaml_str(yaml).unwrap();
        assert!(cfg.validate().is_err(), "{:?} should be invalid", yaml);
    }
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}
