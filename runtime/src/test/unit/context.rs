use crate::context::{DEFAULT_WORKER_COUNT, ExecutionContext};
use crate::error::Error;

#[test]
fn test_default_worker_count() {
    assert_eq!(DEFAULT_WORKER_COUNT, 20);
    assert_eq!(ExecutionContext::default().worker_count(), 20);
}

#[test]
fn test_zero_workers_rejected() {
    assert!(matches!(ExecutionContext::new(0).unwrap_err(), Error::ZeroWorkers));
    assert_eq!(ExecutionContext::new(7).unwrap().worker_count(), 7);
}
