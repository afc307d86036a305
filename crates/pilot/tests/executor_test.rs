//! Executor behavior against the in-memory control plane

mod common;

use std::time::Duration;

use common::*;
use pilot::{cancel_pair, ControlError, ExecutionError, Fault, RunContext};
use topology::{plan_update, NodeGroup, OperationKind, Phase, Role};

#[tokio::test]
async fn test_operations_issued_in_plan_order() {
    let control = control();
    let plan = plan();
    let report = executor(control.clone(), 60).execute(&plan, &RunContext::new()).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(targets(&control.calls()), PLAN_ORDER);
    assert_eq!(report.applied.len(), PLAN_ORDER.len());
    assert!(report.skipped.is_empty());
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn test_apply_converges() {
    let control = control();
    let report = executor(control.clone(), 60).execute(&plan(), &RunContext::new()).await;
    assert!(report.is_success());

    let after = control.snapshot().await;
    assert_eq!(after, desired());
    assert!(plan_update(&desired(), &after).plan.is_empty());
}

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let control = control();
    control.inject(group("managers"), Fault::FailOnCompletion);

    let report = executor(control.clone(), 60).execute(&plan(), &RunContext::new()).await;

    assert!(!report.is_success());
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.failed.as_ref().map(|op| op.target.clone()), Some(group("managers")));
    assert_eq!(report.skipped.len(), 5);
    assert!(matches!(
        report.error,
        Some(ExecutionError::Remote {
            source: ControlError::Failed { .. },
            ..
        })
    ));
    assert!(report.diagnostics.has_errors());
    // nothing after the failed operation reached the control plane
    assert_eq!(control.calls().len(), 3);
    // no rollback either
    let state = control.snapshot().await;
    assert!(state.node_groups.contains_key("analytics"));
    assert_eq!(state.node_groups["managers"].hosts_count, 3);
}

#[tokio::test]
async fn test_rejected_request_stops_the_run() {
    let control = control();
    control.inject(group("analytics"), Fault::Reject);

    let report = executor(control.clone(), 60).execute(&plan(), &RunContext::new()).await;

    assert!(matches!(
        report.error,
        Some(ExecutionError::Remote {
            source: ControlError::Rejected { .. },
            ..
        })
    ));
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped.len(), PLAN_ORDER.len() - 1);
    assert_eq!(control.snapshot().await, observed());
}

#[tokio::test(start_paused = true)]
async fn test_operation_timeout() {
    let control = control();
    control.inject(group("data"), Fault::Hang);

    let report = executor(control.clone(), 10).execute(&plan(), &RunContext::new()).await;

    assert_eq!(
        report.error,
        Some(ExecutionError::OperationTimeout {
            target: group("data"),
            timeout: Duration::from_secs(10),
        })
    );
    assert_eq!(report.applied.len(), 3);
    assert_eq!(report.skipped.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_run_deadline_bounds_the_wait() {
    let control = control();
    control.inject(group("managers"), Fault::Hang);

    let ctx = RunContext::new().with_timeout(Duration::from_secs(5));
    let report = executor(control.clone(), 1800).execute(&plan(), &ctx).await;

    assert_eq!(report.error, Some(ExecutionError::DeadlineExceeded));
    assert_eq!(report.failed.as_ref().map(|op| op.target.clone()), Some(group("managers")));
    assert_eq!(control.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_expired_deadline_issues_nothing() {
    let control = control();
    let ctx = RunContext::new().with_timeout(Duration::ZERO);

    let report = executor(control.clone(), 60).execute(&plan(), &ctx).await;

    assert_eq!(report.error, Some(ExecutionError::DeadlineExceeded));
    assert!(report.failed.is_none());
    assert_eq!(report.skipped.len(), PLAN_ORDER.len());
    assert!(control.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_issuance() {
    let control = control();
    control.inject(group("managers"), Fault::Hang);

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let ctx = RunContext::new().with_cancel(signal);
    let report = executor(control.clone(), 1800).execute(&plan(), &ctx).await;

    assert_eq!(report.error, Some(ExecutionError::Cancelled));
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.skipped.len(), 5);
    assert_eq!(control.calls().len(), 3);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let control = control();
    let (cancel, signal) = cancel_pair();
    cancel.cancel();

    let report = executor(control.clone(), 60)
        .execute(&plan(), &RunContext::new().with_cancel(signal))
        .await;

    assert_eq!(report.error, Some(ExecutionError::Cancelled));
    assert!(control.calls().is_empty());
}

#[tokio::test]
async fn test_manager_decrease_reaches_control_plane_last() {
    let observed = topology::Topology::new()
        .with(NodeGroup::new("managers", [Role::Manager], 5))
        .with(NodeGroup::new("hot", [Role::Manager, Role::Data], 3))
        .with(NodeGroup::new("data", [Role::Data], 3));
    let desired = topology::Topology::new()
        .with(NodeGroup::new("managers", [Role::Manager], 3))
        .with(NodeGroup::new("hot", [Role::Data], 3))
        .with(NodeGroup::new("data", [Role::Data], 4));
    let control = std::sync::Arc::new(pilot::InMemoryControlPlane::new(observed.clone()));

    let plan = plan_update(&desired, &observed).into_result().unwrap();
    let phases: Vec<_> = plan.batches.iter().map(|b| b.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::DataManagerShrink, Phase::UpdateAndDelete, Phase::ManagerDecrease]
    );

    let report = executor(control.clone(), 60).execute(&plan, &RunContext::new()).await;
    assert!(report.is_success(), "{}", report);

    let calls = control.calls();
    assert!(calls.iter().all(|c| c.kind == OperationKind::Update));
    assert_eq!(
        targets(&calls),
        vec!["node_group/hot", "node_group/data", "node_group/managers"]
    );
    assert_eq!(control.snapshot().await, desired);
}
