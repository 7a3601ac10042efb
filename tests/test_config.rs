use std::time::Duration;

use keepwire::config::{Config, LISTEN_ENV};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.read_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.server.write_timeout(), Duration::from_secs(10));
    assert!(cfg.server.validate().is_ok());
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml(
        r#"
server:
  listen_addr: "0.0.0.0:3000"
  read_timeout_ms: 250
  write_timeout_ms: 500
  idle_timeout_ms: 1500
  max_requests_per_connection: 7
  max_connections: 3
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.read_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.server.write_timeout(), Duration::from_millis(500));
    assert_eq!(cfg.server.idle_timeout(), Duration::from_millis(1500));
    assert_eq!(cfg.server.max_requests_per_connection, 7);
    assert_eq!(cfg.server.max_connections, 3);
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml("server:\n  max_connections: 8\n").unwrap();

    assert_eq!(cfg.server.max_connections, 8);
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.max_requests_per_connection, 100);
}

#[test]
fn test_config_invalid_yaml() {
    assert!(Config::from_yaml("server:\n  max_connections: lots\n").is_err());
}

#[test]
fn test_config_validation_rejects_zero_limits() {
    let mut cfg = Config::default();
    cfg.server.max_connections = 0;
    assert!(cfg.server.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.max_requests_per_connection = 0;
    assert!(cfg.server.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.idle_timeout_ms = 0;
    assert!(cfg.server.validate().is_err());

    let mut cfg = Config::default();
    cfg.server.listen_addr = "  ".to_string();
    assert!(cfg.server.validate().is_err());
}

#[test]
fn test_config_listen_override_from_env() {
    // Only test in this binary that touches the environment.
    unsafe {
        std::env::set_var(LISTEN_ENV, "0.0.0.0:5000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:5000");

    unsafe {
        std::env::remove_var(LISTEN_ENV);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
}
