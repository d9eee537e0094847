//! Tests for error types

use fleet_scheduler::core::{resource_set, ClientId, SchedulerError};

#[test]
fn test_invalid_argument_error() {
    let err = SchedulerError::InvalidArgument("empty set".to_string());
    assert_eq!(format!("{}", err), "invalid argument: empty set");
}

#[test]
fn test_protocol_violation_error() {
    let err = SchedulerError::ProtocolViolation {
        client: ClientId::new("V1"),
        reason: "not next in claim".to_string(),
    };
    assert_eq!(format!("{}", err), "protocol violation by V1: not next in claim");
}

#[test]
fn test_resource_allocation_error() {
    let err = SchedulerError::ResourceAllocation {
        client: ClientId::new("V2"),
        resources: resource_set(["P1", "P2"]),
    };
    assert_eq!(
        format!("{}", err),
        "could not allocate {P1, P2} for V2: resources unavailable"
    );
}

#[test]
fn test_not_initialized_error() {
    let err = SchedulerError::NotInitialized;
    assert_eq!(format!("{}", err), "scheduler not initialized");
}

#[test]
fn test_config_and_executor_errors() {
    let err = SchedulerError::Config("bad block".to_string());
    assert_eq!(format!("{}", err), "config error: bad block");
    let err = SchedulerError::Executor("shut down".to_string());
    assert_eq!(format!("{}", err), "executor error: shut down");
}
