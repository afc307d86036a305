//! Plan executor
//!
//! Issues the operations of a plan one at a time, in plan order, and waits
//! for each remote operation to finish before issuing the next one. The
//! first failure stops the run; nothing already applied is retracted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use topology::{Diagnostic, Diagnostics, EntityRef, Operation, OperationKind, OperationPlan};

use crate::config::ExecutorConfig;
use crate::control::{ClusterControlApi, ControlError, OperationHandle};

/// Execution error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("{target}: {source}")]
    Remote {
        target: EntityRef,
        #[source]
        source: ControlError,
    },
    #[error("{target}: operation did not finish within {timeout:?}")]
    OperationTimeout { target: EntityRef, timeout: Duration },
    #[error("run deadline exceeded")]
    DeadlineExceeded,
    #[error("run cancelled")]
    Cancelled,
}

/// Create a linked cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Requests cancellation of a run
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Another signal observing this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes cancellation
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation has been requested
    ///
    /// Pends forever when the handle was dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Bounds of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// No operation is issued or awaited past this instant
    pub deadline: Option<Instant>,
    pub cancel: CancelSignal,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            deadline: None,
            cancel: CancelSignal::never(),
        }
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fail when the run must not issue anything more
    fn check(&self) -> Result<(), ExecutionError> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ExecutionError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Operations that completed, in execution order
    pub applied: Vec<Operation>,
    /// Operation that failed, if the failure happened after it was issued
    pub failed: Option<Operation>,
    /// Operations never issued
    pub skipped: Vec<Operation>,
    pub error: Option<ExecutionError>,
    pub diagnostics: Diagnostics,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            applied: Vec::new(),
            failed: None,
            skipped: Vec::new(),
            error: None,
            diagnostics: Diagnostics::new(),
            started_at: now,
            finished_at: now,
        }
    }

    fn abort(&mut self, failed: Option<Operation>, error: ExecutionError) {
        let mut diagnostic = Diagnostic::error(error.to_string());
        if let Some(op) = &failed {
            diagnostic = diagnostic
                .with_detail(format!("while executing {} in phase {}", op, op.phase))
                .with_target(op.target.clone());
        }
        self.diagnostics.push(diagnostic);
        self.failed = failed;
        self.error = Some(error);
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl std::fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for op in &self.applied {
            writeln!(f, "applied: {}", op)?;
        }
        if let Some(op) = &self.failed {
            writeln!(f, "failed:  {}", op)?;
        }
        for op in &self.skipped {
            writeln!(f, "skipped: {}", op)?;
        }
        match &self.error {
            None => write!(f, "result: success ({} operations)", self.applied.len()),
            Some(e) => write!(f, "result: {}", e),
        }
    }
}

/// Runs operation plans against a control API
pub struct Executor {
    api: Arc<dyn ClusterControlApi>,
    operation_timeout: Duration,
}

impl Executor {
    pub fn new(api: Arc<dyn ClusterControlApi>, config: &ExecutorConfig) -> Self {
        Self {
            api,
            operation_timeout: config.operation_timeout(),
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Execute a plan, stopping at the first failure
    pub async fn execute(&self, plan: &OperationPlan, ctx: &RunContext) -> ExecutionReport {
        let mut report = ExecutionReport::start();
        let mut cancel = ctx.cancel.clone();
        let mut ops = plan.operations();

        info!("Executing plan: {} operations in {} phases", plan.len(), plan.batches.len());

        while let Some(op) = ops.next() {
            if let Err(e) = ctx.check() {
                warn!("Stopping before {}: {}", op, e);
                report.abort(None, e);
                report.skipped.push(op.clone());
                report.skipped.extend(ops.by_ref().cloned());
                break;
            }

            match self.run_operation(op, ctx, &mut cancel).await {
                Ok(()) => {
                    info!("Applied {}", op);
                    report.applied.push(op.clone());
                }
                Err(e) => {
                    error!("Failed {}: {}", op, e);
                    report.abort(Some(op.clone()), e);
                    report.skipped.extend(ops.by_ref().cloned());
                    break;
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            "Plan execution finished: {} applied, {} skipped, success={}",
            report.applied.len(),
            report.skipped.len(),
            report.is_success()
        );
        report
    }

    async fn run_operation(
        &self,
        op: &Operation,
        ctx: &RunContext,
        cancel: &mut CancelSignal,
    ) -> Result<(), ExecutionError> {
        let op_deadline = Instant::now() + self.operation_timeout;
        let (limit, by_run_deadline) = match ctx.deadline {
            Some(deadline) if deadline < op_deadline => (deadline, true),
            _ => (op_deadline, false),
        };

        let work = async {
            let handle = self.issue(op).await?;
            debug!("{} accepted as operation {}", op.target, handle.id());
            handle.wait().await
        };

        // an operation that already finished wins over a concurrent cancel
        tokio::select! {
            biased;
            result = tokio::time::timeout_at(limit, work) => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) => Err(ExecutionError::Remote {
                    target: op.target.clone(),
                    source,
                }),
                Err(_) if by_run_deadline => Err(ExecutionError::DeadlineExceeded),
                Err(_) => Err(ExecutionError::OperationTimeout {
                    target: op.target.clone(),
                    timeout: self.operation_timeout,
                }),
            },
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
        }
    }

    async fn issue(&self, op: &Operation) -> Result<OperationHandle, ControlError> {
        match (op.kind, &op.entity) {
            (OperationKind::Create, Some(entity)) => self.api.create(entity).await,
            (OperationKind::Update, Some(entity)) => {
                self.api.update(&op.target, &op.field_mask, entity).await
            }
            (OperationKind::Delete, _) => self.api.delete(&op.target).await,
            (kind, None) => Err(ControlError::Rejected {
                target: op.target.clone(),
                reason: format!("{} without entity", kind),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use topology::{Entity, FieldMask, Shard, Topology};

    /// Control API whose operations are done as soon as they are accepted
    struct Immediate;

    #[async_trait]
    impl ClusterControlApi for Immediate {
        async fn create(&self, entity: &Entity) -> Result<OperationHandle, ControlError> {
            Ok(OperationHandle::resolved(entity.name(), Ok(())))
        }

        async fn update(
            &self,
            target: &EntityRef,
            _field_mask: &FieldMask,
            _entity: &Entity,
        ) -> Result<OperationHandle, ControlError> {
            Ok(OperationHandle::resolved(target.name.clone(), Ok(())))
        }

        async fn delete(&self, target: &EntityRef) -> Result<OperationHandle, ControlError> {
            Ok(OperationHandle::resolved(target.name.clone(), Ok(())))
        }
    }

    #[tokio::test]
    async fn test_finished_operation_wins_over_cancel() {
        let executor = Executor::new(Arc::new(Immediate), &ExecutorConfig::default());
        let desired = Topology::new().with(Shard::new("s1", 1));
        let plan = topology::reconcile(&desired, &Topology::new()).plan;
        let op = plan.operations().next().unwrap();

        let (handle, mut signal) = cancel_pair();
        handle.cancel();
        let result = executor.run_operation(op, &RunContext::new(), &mut signal).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_cancel_signal_fires() {
        let (handle, mut signal) = cancel_pair();
        assert!(!signal.is_cancelled());
        handle.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
        assert!(handle.signal().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_pends() {
        let mut signal = CancelSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_check() {
        let (handle, signal) = cancel_pair();
        let ctx = RunContext::new().with_timeout(Duration::from_secs(5)).with_cancel(signal);
        assert_eq!(ctx.check(), Ok(()));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(ctx.check(), Err(ExecutionError::DeadlineExceeded));

        handle.cancel();
        assert_eq!(ctx.check(), Err(ExecutionError::Cancelled));
    }
}
