use std::cell::Cell;
use std::time::Duration;

use permitwatch_core::error::PipelineError;
use permitwatch_core::retry::RetryPolicy;

fn instant_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

fn transient() -> PipelineError {
    PipelineError::HttpStatus {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[test]
fn transient_errors_are_retried_until_success() {
    let calls = Cell::new(0u32);
    let result = instant_policy(4).run(|| {
        calls.set(calls.get() + 1);
        if calls.get() < 3 {
            Err(transient())
        } else {
            Ok(42)
        }
    });

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.get(), 3);
}

#[test]
fn exhausted_budget_escalates_to_run_failure() {
    let calls = Cell::new(0u32);
    let result: Result<(), _> = instant_policy(4).run(|| {
        calls.set(calls.get() + 1);
        Err(transient())
    });

    assert_eq!(calls.get(), 4);
    match result {
        Err(PipelineError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[test]
fn non_transient_errors_fail_immediately() {
    let calls = Cell::new(0u32);
    let result: Result<(), _> = instant_policy(4).run(|| {
        calls.set(calls.get() + 1);
        Err(PipelineError::ApiError("bad query".to_string()))
    });

    assert_eq!(calls.get(), 1);
    assert!(matches!(result, Err(PipelineError::ApiError(_))));
}

#[test]
fn rate_limit_status_is_transient_but_client_errors_are_not() {
    assert!(PipelineError::HttpStatus { status: 429, body: String::new() }.is_transient());
    assert!(PipelineError::HttpStatus { status: 500, body: String::new() }.is_transient());
    assert!(!PipelineError::HttpStatus { status: 400, body: String::new() }.is_transient());
    assert!(!PipelineError::MalformedPage("x".to_string()).is_transient());
    assert!(!PipelineError::EmptyResultSet.is_transient());
}
