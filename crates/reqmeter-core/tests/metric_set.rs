//! MetricSet construction: names, constant labels, buckets, conflicts.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use reqmeter_core::metric_set::{fq_name, validate_buckets};
use reqmeter_core::{
    ConstLabels, ErrorKind, MetricDesc, MetricSet, MetricSink, ReqMeterError, DEFAULT_BUCKETS,
};
use support::RecordingSink;

#[test]
fn default_names_and_schema() {
    let sink = RecordingSink::default();
    let set =
        MetricSet::build(&sink, "orders", "http", "", Vec::<(String, String)>::new()).unwrap();

    assert_eq!(
        set.names(),
        [
            "http_requests_total",
            "http_request_duration_seconds",
            "http_requests_in_progress_total"
        ]
    );

    let counter = sink.desc("http_requests_total");
    assert_eq!(counter.label_names, &["status_code", "method", "path"]);
    assert_eq!(counter.const_labels.get("service"), Some("orders"));

    let gauge = sink.desc("http_requests_in_progress_total");
    assert_eq!(gauge.label_names, &["method"]);

    assert_eq!(*sink.buckets.lock().unwrap(), DEFAULT_BUCKETS.to_vec());
}

#[test]
fn namespace_and_subsystem_prefix() {
    assert_eq!(fq_name("my_app", "http", "requests_total"), "my_app_http_requests_total");
    assert_eq!(fq_name("http", "", "requests_total"), "http_requests_total");
    assert_eq!(fq_name("", "", "requests_total"), "requests_total");

    let sink = RecordingSink::default();
    let set = MetricSet::build(&sink, "svc", "my_app", "http", [("k", "v")]).unwrap();
    assert_eq!(set.names()[1], "my_app_http_request_duration_seconds");
}

#[test]
fn const_labels_merge_service_and_extras() {
    let sink = RecordingSink::default();
    let set = MetricSet::build(
        &sink,
        "svc",
        "http",
        "",
        [("key1", "value1"), ("key2", "value2")],
    )
    .unwrap();

    let labels: Vec<_> = set.const_labels().iter().collect();
    assert_eq!(
        labels,
        vec![("key1", "value1"), ("key2", "value2"), ("service", "svc")]
    );
}

#[test]
fn empty_service_adds_no_label() {
    let labels = ConstLabels::builder().service("").label("env", "prod").build().unwrap();
    assert_eq!(labels.get("service"), None);
    assert_eq!(labels.len(), 1);
}

#[test]
fn reserved_label_rejected() {
    for reserved in ["status_code", "method", "path"] {
        let err = ConstLabels::builder().label(reserved, "x").build().unwrap_err();
        assert!(matches!(err, ReqMeterError::ReservedLabel(ref n) if n == reserved));
        assert_eq!(err.kind(), ErrorKind::InvalidLabel);
    }

    let sink = RecordingSink::default();
    let err = MetricSet::build(&sink, "svc", "http", "", [("path", "/x")]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidLabel);
    assert!(sink.descs.lock().unwrap().is_empty(), "nothing registered on failure");
}

#[test]
fn malformed_label_rejected() {
    for bad in ["", "1abc", "has-dash", "__internal"] {
        let err = ConstLabels::builder().label(bad, "x").build().unwrap_err();
        assert!(matches!(err, ReqMeterError::InvalidLabelName(_)), "{bad:?}");
    }
}

#[test]
fn invalid_namespace_rejected() {
    let sink = RecordingSink::default();
    let err = MetricSet::builder()
        .namespace("my-app")
        .build(&sink)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidName);
}

#[test]
fn duplicate_registration_surfaces() {
    let sink = RecordingSink::default();
    MetricSet::build(&sink, "a", "http", "", Vec::<(String, String)>::new()).unwrap();

    let err = MetricSet::build(&sink, "b", "http", "", Vec::<(String, String)>::new())
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Registration);

    // a distinct namespace on the same sink is fine
    MetricSet::build(&sink, "b", "billing", "", Vec::<(String, String)>::new()).unwrap();
}

#[test]
fn failed_build_leaves_nothing_registered() {
    let sink = RecordingSink::default();
    let taken = MetricDesc {
        name: "http_requests_in_progress_total".to_string(),
        help: "taken",
        const_labels: ConstLabels::builder().build().unwrap(),
        label_names: &["method"],
    };
    sink.register_gauge(taken.clone()).unwrap();

    let err = MetricSet::build(&sink, "svc", "http", "", Vec::<(String, String)>::new())
        .err()
        .unwrap();
    assert!(matches!(err, ReqMeterError::AlreadyRegistered(_)));
    assert_eq!(sink.registered(), vec!["http_requests_in_progress_total"]);

    // retry once the conflict is gone
    sink.unregister(&taken).unwrap();
    MetricSet::build(&sink, "svc", "http", "", Vec::<(String, String)>::new()).unwrap();
    assert_eq!(sink.registered().len(), 3);
}

#[test]
fn bucket_override() {
    let sink = RecordingSink::default();
    MetricSet::builder()
        .buckets(vec![0.01, 0.1, 1.0])
        .build(&sink)
        .unwrap();
    assert_eq!(*sink.buckets.lock().unwrap(), vec![0.01, 0.1, 1.0]);

    assert!(validate_buckets(&[]).is_err());
    assert!(validate_buckets(&[0.1, 0.1]).is_err());
    assert!(validate_buckets(&[1.0, f64::INFINITY]).is_err());
    assert!(validate_buckets(&DEFAULT_BUCKETS).is_ok());
}

#[test]
fn default_buckets_span_ns_to_30s() {
    assert_eq!(DEFAULT_BUCKETS.len(), 34);
    assert_eq!(DEFAULT_BUCKETS[0], 1e-9);
    assert_eq!(DEFAULT_BUCKETS[DEFAULT_BUCKETS.len() - 1], 30.0);
}
