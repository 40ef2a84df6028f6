//! Request decoding tests for declarations and mutations.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rpcmetrics_core::protocol::{CollectorType, Declaration, Metric, UnregisterRequest};

#[test]
fn metric_lowercase_keys() {
    let m: Metric =
        serde_json::from_str(r#"{"name":"test","value":123,"labels":["test1","test2"]}"#).unwrap();
    assert_eq!(m.name, "test");
    assert_eq!(m.namespace, "");
    assert_eq!(m.value, 123.0);
    assert_eq!(m.labels, vec!["test1", "test2"]);
}

#[test]
fn metric_pascal_case_keys() {
    let m: Metric = serde_json::from_str(
        r#"{"Name":"test","Namespace":"app","Value":1.5,"Labels":["a"]}"#,
    )
    .unwrap();
    assert_eq!(m, Metric::new("test", 1.5).with_namespace("app").with_labels(["a"]));
}

#[test]
fn metric_rejects_unknown_fields() {
    let err = serde_json::from_str::<Metric>(r#"{"name":"x","valeu":1}"#);
    assert!(err.is_err());
}

#[test]
fn declaration_with_json_objectives() {
    let d: Declaration = serde_json::from_str(
        r#"{
            "name": "rpc_latency",
            "collector": {
                "namespace": "app",
                "type": "summary",
                "help": "latency",
                "labels": ["method"],
                "objectives": {"0.99": 0.001, "0.5": 0.05}
            }
        }"#,
    )
    .unwrap();

    assert_eq!(d.name, "rpc_latency");
    assert_eq!(
        d.collector.collector_type(&d.name).unwrap(),
        CollectorType::Summary
    );
    let qs: Vec<f64> = d.collector.objectives.iter().map(|o| o.quantile).collect();
    assert_eq!(qs, vec![0.5, 0.99]);
    assert_eq!(d.collector.objectives[0].error, 0.05);
}

#[test]
fn declaration_with_yaml_float_keys() {
    let yaml = r#"
name: rpc_latency
collector:
  type: summary
  objectives:
    0.9: 0.01
    0.5: 0.05
"#;
    let d: Declaration = serde_yaml::from_str(yaml).unwrap();
    let qs: Vec<f64> = d.collector.objectives.iter().map(|o| o.quantile).collect();
    assert_eq!(qs, vec![0.5, 0.9]);
}

#[test]
fn declaration_keeps_unknown_type_tag_for_the_factory() {
    let d: Declaration =
        serde_json::from_str(r#"{"name":"x","collector":{"type":"meter"}}"#).unwrap();
    assert_eq!(d.collector.kind, "meter");
    assert!(d.collector.collector_type("x").is_err());
}

#[test]
fn unregister_namespace_is_optional() {
    let r: UnregisterRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
    assert_eq!(r.name, "x");
    assert!(r.namespace.is_empty());
}
