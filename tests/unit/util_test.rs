//! Tests for utility functions

use fleet_scheduler::util::{init_tracing, init_tracing_with_filter, now_ms};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with_filter("fleet_scheduler=debug");
    init_tracing();
    init_tracing_with_filter("not a [valid filter");
}
