//! Tests for error types

use prometheus_planner::core::{AppResult, PlannerError};

#[test]
fn test_error_display() {
    assert_eq!(PlannerError::Overflow.to_string(), "task queue overflow");
    assert_eq!(PlannerError::NotActive.to_string(), "object is not active");
    assert_eq!(
        PlannerError::AlreadyStarted.to_string(),
        "threads already started"
    );
    assert_eq!(
        PlannerError::InvalidArgument("null task".into()).to_string(),
        "invalid argument: null task"
    );
    assert_eq!(
        PlannerError::Join("boom".into()).to_string(),
        "thread join failed: boom"
    );
    assert_eq!(
        PlannerError::InvalidConfig("bad".into()).to_string(),
        "invalid configuration: bad"
    );
}

#[test]
fn test_planner_error_flows_through_app_result() {
    fn enqueue() -> Result<(), PlannerError> {
        Err(PlannerError::Overflow)
    }
    fn body() -> AppResult<()> {
        enqueue()?;
        Ok(())
    }

    let err = body().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PlannerError>(),
        Some(PlannerError::Overflow)
    ));
}
