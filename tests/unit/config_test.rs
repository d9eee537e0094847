//! Tests for configuration validation

use fleet_scheduler::config::{BlockConfig, ExecutorConfig, SchedulerConfig};

fn block(name: &str, resources: &[&str]) -> BlockConfig {
    BlockConfig {
        name: name.to_string(),
        resources: resources.iter().map(|r| r.to_string()).collect(),
    }
}

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.executor, ExecutorConfig::ThreadPool { worker_count: None });
    assert!(cfg.audit_capacity.is_none());
    assert!(cfg.blocks.is_empty());
}

#[test]
fn test_zero_worker_count_rejected() {
    let cfg = SchedulerConfig {
        executor: ExecutorConfig::ThreadPool {
            worker_count: Some(0),
        },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_audit_capacity_rejected() {
    let cfg = SchedulerConfig {
        audit_capacity: Some(0),
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_block_validation() {
    let mut cfg = SchedulerConfig {
        blocks: vec![block("corridor", &["P1", "P2"])],
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_ok());

    cfg.blocks.push(block("corridor", &["P3"]));
    assert!(cfg.validate().unwrap_err().contains("duplicate"));

    cfg.blocks = vec![block("empty", &[])];
    assert!(cfg.validate().is_err());

    cfg.blocks = vec![block("  ", &["P1"])];
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "executor": { "kind": "thread_pool", "worker_count": 3 },
        "log_filter": "fleet_scheduler=debug",
        "audit_capacity": 500,
        "blocks": [ { "name": "junction", "resources": ["P4", "P4--P5", "P5"] } ]
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.executor, ExecutorConfig::ThreadPool { worker_count: Some(3) });
    assert_eq!(cfg.log_filter.as_deref(), Some("fleet_scheduler=debug"));
    assert_eq!(cfg.audit_capacity, Some(500));
    assert_eq!(cfg.blocks, vec![block("junction", &["P4", "P4--P5", "P5"])]);
}

#[test]
fn test_from_json_str_defaults_and_errors() {
    let cfg = SchedulerConfig::from_json_str(r#"{ "executor": { "kind": "tokio" } }"#).unwrap();
    assert_eq!(cfg.executor, ExecutorConfig::Tokio);
    assert!(cfg.blocks.is_empty());

    assert!(SchedulerConfig::from_json_str("{ not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "executor": { "kind": "fibers" } }"#).is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "audit_capacity": 0 }"#).is_err());
}

#[test]
fn test_config_round_trips_through_serde() {
    let cfg = SchedulerConfig {
        executor: ExecutorConfig::Tokio,
        blocks: vec![block("corridor", &["P1"])],
        ..SchedulerConfig::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains(r#""kind":"tokio""#));
    let back = SchedulerConfig::from_json_str(&json).unwrap();
    assert_eq!(back.executor, cfg.executor);
    assert_eq!(back.blocks, cfg.blocks);
}
