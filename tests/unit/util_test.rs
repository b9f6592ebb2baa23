//! Tests for utility functions

use prometheus_planner::sync::StartGate;
use prometheus_planner::util::clock::deadline_after;
use prometheus_planner::util::telemetry::{init_tracing, init_tracing_with, DEFAULT_DIRECTIVE};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_deadline_after_zero_is_now() {
    let before = Instant::now();
    let deadline = deadline_after(Duration::ZERO);
    assert!(deadline >= before);
    assert!(deadline <= Instant::now());
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing_with(DEFAULT_DIRECTIVE);
    tracing::info!("tracing initialized twice without panicking");
}

#[test]
fn test_start_gate_releases_all_waiters() {
    let gate = Arc::new(StartGate::new());
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.pass())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    gate.open();
    for waiter in waiters {
        assert!(waiter.join().unwrap());
    }
}

#[test]
fn test_start_gate_abort_wins_over_later_open() {
    let gate = StartGate::new();
    gate.abort();
    gate.open();
    assert!(!gate.pass());
}
