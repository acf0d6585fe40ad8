#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use reqmeter_gateway::config::{self, Backend};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  servce: "orders" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.metrics.backend, Backend::InProcess);
    assert_eq!(cfg.metrics.service, "my-service");
    assert_eq!(cfg.metrics.namespace, "http");
    assert_eq!(cfg.metrics.subsystem, "");
    assert_eq!(cfg.metrics.expose_path, "/metrics");
    assert!(cfg.metrics.skip_paths.is_empty());
    assert!(!cfg.metrics.full_paths);
    assert!(cfg.metrics.buckets.is_none());
}

#[test]
fn ok_full_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9000"
metrics:
  backend: prometheus
  service: orders
  namespace: my_app
  subsystem: http
  labels: { region: eu, tier: web }
  expose_path: /internal/metrics
  skip_paths: [/healthz, /readyz]
  full_paths: true
  buckets: [0.01, 0.1, 1.0]
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen_addr().unwrap().port(), 9000);
    assert_eq!(cfg.metrics.backend, Backend::Prometheus);
    assert_eq!(cfg.metrics.labels.get("region").map(String::as_str), Some("eu"));
    assert_eq!(cfg.metrics.skip_paths, vec!["/healthz", "/readyz"]);
    assert!(cfg.metrics.full_paths);
    assert_eq!(cfg.metrics.buckets, Some(vec![0.01, 0.1, 1.0]));
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "version: 2\n",
        "version: 1\nserver: { listen: \"not-an-addr\" }\n",
        "version: 1\nmetrics: { expose_path: metrics }\n",
        "version: 1\nmetrics: { skip_paths: [healthz] }\n",
        "version: 1\nmetrics: { skip_paths: [/metrics] }\n",
        "version: 1\nmetrics: { buckets: [1.0, 0.5] }\n",
        "version: 1\nmetrics: { buckets: [] }\n",
        "version: 1\nmetrics: { backend: statsd }\n",
    ];
    for case in cases {
        let err = config::load_from_str(case).expect_err(case);
        assert_eq!(err.kind().as_str(), "CONFIG", "{case}");
    }
}

#[test]
fn empty_service_and_namespace_take_defaults() {
    let yaml = r#"
version: 1
metrics:
  service: ""
  namespace: ""
"#;
    let cfg = config::load_from_str(yaml).expect("must parse");
    assert_eq!(cfg.metrics.service, "my-service");
    assert_eq!(cfg.metrics.namespace, "http");
}

#[test]
fn missing_file_is_config_error() {
    let err = config::load_from_file("/nonexistent/reqmeter.yaml").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}
