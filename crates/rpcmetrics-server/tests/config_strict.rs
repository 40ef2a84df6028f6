#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rpcmetrics_server::config::{self, RedeclarePolicy};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  collect:
    jobs_total:
      type: counter
      lables: ["queue"] # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.metrics.address, "127.0.0.1:2112");
    assert_eq!(cfg.rpc.listen, "127.0.0.1:6001");
    assert_eq!(cfg.metrics.redeclare, RedeclarePolicy::Strict);
    assert!(cfg.metrics.collect.is_empty());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
metrics:
  address: "0.0.0.0:9100"
  redeclare: idempotent
  collect:
    app_metric:
      type: histogram
      help: "Custom application metric"
      labels: ["type"]
      buckets: [0.1, 0.2, 0.3, 1.0]
    app_latency:
      type: summary
      objectives:
        0.5: 0.05
        0.99: 0.001
rpc:
  listen: "127.0.0.1:7001"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.metrics.redeclare, RedeclarePolicy::Idempotent);
    assert_eq!(cfg.metrics.collect.len(), 2);
    assert_eq!(cfg.metrics.collect["app_metric"].buckets, vec![0.1, 0.2, 0.3, 1.0]);
    assert_eq!(cfg.metrics.collect["app_latency"].objectives.len(), 2);
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn unknown_collector_type_fails_at_load() {
    let bad = r#"
version: 1
metrics:
  collect:
    jobs:
      type: meter
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "INVALID_TYPE");
}

#[test]
fn bad_listen_address() {
    let bad = r#"
version: 1
rpc:
  listen: "not-an-addr"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(err.to_string().contains("rpc.listen"));
}

#[test]
fn server_limits_have_defaults() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert!(cfg.metrics.process_collector);
    assert_eq!(cfg.metrics.request_timeout_secs, 120);
    assert_eq!(cfg.rpc.request_timeout_secs, 120);
    assert_eq!(cfg.rpc.max_body_bytes, 1 << 20);
}

#[test]
fn zero_limits_rejected() {
    let bad = r#"
version: 1
rpc:
  max_body_bytes: 0
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(err.to_string().contains("rpc.max_body_bytes"));
}

#[test]
fn missing_file_names_the_path() {
    let err = config::load(Some("/nonexistent/rpcmetrics.yaml")).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(err.to_string().contains("/nonexistent/rpcmetrics.yaml"));
}

#[test]
fn file_errors_carry_the_path() {
    let path = std::env::temp_dir().join(format!("rpcmetrics-bad-{}.yaml", std::process::id()));
    std::fs::write(&path, "version: 1\nmetricz: {}\n").unwrap();
    let path = path.to_str().unwrap().to_string();

    let err = config::load(Some(&path)).expect_err("must fail");
    let _ = std::fs::remove_file(&path);
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(err.to_string().contains(&path));
}
