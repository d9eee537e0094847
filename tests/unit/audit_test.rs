//! Tests for audit sink

use fleet_scheduler::core::{build_audit_event, resource_set, AuditSink, ClientId, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        &ClientId::new("V1"),
        "grant",
        &resource_set(["P2", "P1"]),
        Some("after retry".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].client, ClientId::new("V1"));
    assert_eq!(events[0].action, "grant");
    assert_eq!(events[0].resources, vec!["P1".to_string(), "P2".to_string()]);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let client = ClientId::new("V1");

    for name in ["P1", "P2", "P3"] {
        sink.record(build_audit_event(&client, "free", &resource_set([name]), None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].resources, vec!["P2".to_string()]); // First one popped
    assert_eq!(events[1].resources, vec!["P3".to_string()]);
}

#[test]
fn test_clones_share_buffer() {
    let reader = InMemoryAuditSink::new(10);
    let mut writer = reader.clone();
    let client = ClientId::new("V1");

    writer.record(build_audit_event(&client, "claim", &resource_set(["P1"]), None));
    writer.record(build_audit_event(&client, "defer", &resource_set(["P1"]), None));

    assert_eq!(reader.events().len(), 2);
    assert_eq!(reader.events_for("defer").len(), 1);
    assert!(reader.events_for("reject").is_empty());
}

#[test]
fn test_build_audit_event() {
    let a = build_audit_event(&ClientId::new("V1"), "reject", &resource_set(["P1"]), None);
    let b = build_audit_event(&ClientId::new("V1"), "reject", &resource_set(["P1"]), None);

    assert_ne!(a.event_id, b.event_id);
    assert!(uuid::Uuid::parse_str(&a.event_id).is_ok());
    assert!(a.created_at_ms > 0);
    assert!(a.detail.is_none());
}
