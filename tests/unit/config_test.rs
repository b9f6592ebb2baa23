//! Tests for configuration validation and loading

use prometheus_planner::config::{PlannerConfig, SchedulerConfig, WorkerPoolConfig};
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let pool = WorkerPoolConfig::default();
    assert!(pool.thread_count >= 1);
    assert_eq!(pool.max_pending_tasks, 0);
    assert!(pool.start_threads);
    assert!(pool.validate().is_ok());

    let scheduler = SchedulerConfig::default();
    assert!(!scheduler.delivery_time_adjustment);
    assert_eq!(scheduler.max_delivery_shift_ms, 100);
    assert!(scheduler.start_thread);
}

#[test]
fn test_pool_config_invalid_values() {
    assert!(WorkerPoolConfig::new().with_thread_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_stack_size(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_name("  ").validate().is_err());
    assert!(SchedulerConfig::new().with_stack_size(0).validate().is_err());
}

#[test]
fn test_generated_names_are_unique() {
    let cfg = WorkerPoolConfig::new();
    let a = cfg.resolved_name();
    let b = cfg.resolved_name();
    assert!(a.starts_with("worker-pool-"));
    assert_ne!(a, b);
    assert!(SchedulerConfig::new().resolved_name().starts_with("scheduler-"));
    assert_eq!(
        WorkerPoolConfig::new().with_name("io").resolved_name(),
        "io"
    );
}

#[test]
fn test_from_json_partial() {
    let cfg = PlannerConfig::from_json_str(
        r#"{ "pool": { "thread_count": 3, "max_pending_tasks": 16 },
             "scheduler": { "delivery_time_adjustment": true } }"#,
    )
    .unwrap();
    assert_eq!(cfg.pool.thread_count, 3);
    assert_eq!(cfg.pool.max_pending_tasks, 16);
    assert!(cfg.scheduler.delivery_time_adjustment);
    assert_eq!(cfg.scheduler.max_delivery_shift_ms, 100);
}

#[test]
fn test_from_json_rejects_invalid() {
    let err = PlannerConfig::from_json_str(r#"{ "pool": { "thread_count": 0 } }"#).unwrap_err();
    assert!(err.starts_with("pool invalid"));
    assert!(PlannerConfig::from_json_str("{ not json").is_err());
}

#[test]
fn test_json_roundtrip_preserves_fields() {
    let cfg = PlannerConfig {
        pool: WorkerPoolConfig::new().with_name("p").with_thread_count(2),
        scheduler: SchedulerConfig::new().with_max_delivery_shift_ms(5),
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(PlannerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_from_lookup() {
    let cfg = PlannerConfig::from_lookup(lookup(&[
        ("PLANNER_POOL_NAME", "ingest"),
        ("PLANNER_THREADS", "4"),
        ("PLANNER_STACK_SIZE", "1048576"),
        ("PLANNER_MAX_PENDING_TASKS", " 32 "),
        ("PLANNER_SCHEDULER_NAME", "timer"),
        ("PLANNER_DELIVERY_TIME_ADJUSTMENT", "true"),
        ("PLANNER_MAX_DELIVERY_SHIFT_MS", "20"),
    ]))
    .unwrap();

    assert_eq!(cfg.pool.name.as_deref(), Some("ingest"));
    assert_eq!(cfg.pool.thread_count, 4);
    assert_eq!(cfg.pool.stack_size, Some(1_048_576));
    assert_eq!(cfg.scheduler.stack_size, Some(1_048_576));
    assert_eq!(cfg.pool.max_pending_tasks, 32);
    assert_eq!(cfg.scheduler.name.as_deref(), Some("timer"));
    assert!(cfg.scheduler.delivery_time_adjustment);
    assert_eq!(cfg.scheduler.max_delivery_shift_ms, 20);
}

#[test]
fn test_from_lookup_names_bad_variable() {
    let err = PlannerConfig::from_lookup(lookup(&[("PLANNER_THREADS", "many")])).unwrap_err();
    assert!(err.starts_with("PLANNER_THREADS: cannot parse `many`"));

    let err = PlannerConfig::from_lookup(lookup(&[("PLANNER_THREADS", "0")])).unwrap_err();
    assert!(err.contains("thread_count"));
}

#[test]
fn test_from_lookup_empty_is_default() {
    let cfg = PlannerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, PlannerConfig::default());
}
