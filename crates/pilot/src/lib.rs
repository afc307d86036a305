//! Pilot - topology reconciler for managed database clusters
//!
//! Plans the changes that move a cluster from its observed topology to the
//! desired one and drives them through the cluster control API.
//!
//! # Features
//! - Plan-time validation and phase-ordered planning (see the `topology` crate)
//! - Sequential, fail-fast execution with per-operation timeouts
//! - Run deadline and cancellation
//! - In-memory control plane for simulation and tests
//!
//! # Usage Example
//! ```ignore
//! use pilot::{Config, Pilot, RunContext};
//!
//! let pilot = Pilot::new(Config::default(), api);
//! let report = pilot.apply(&desired, &observed, &RunContext::new()).await?;
//! println!("{}", report);
//! ```

pub mod config;
pub mod control;
pub mod executor;
pub mod memory;
pub mod snapshot;

// Re-export commonly used types
pub use config::Config;
pub use control::{ClusterControlApi, ControlError, OperationCompleter, OperationHandle};
pub use executor::{
    cancel_pair, CancelHandle, CancelSignal, ExecutionError, ExecutionReport, Executor, RunContext,
};
pub use memory::{ControlCall, Fault, InMemoryControlPlane};

use std::sync::Arc;
use tracing::{info, warn};

use topology::{plan_update, Diagnostics, Reconciliation, Topology};

/// Reconciler bound to one control API
pub struct Pilot {
    config: Config,
    executor: Executor,
}

impl Pilot {
    pub fn new(config: Config, api: Arc<dyn ClusterControlApi>) -> Self {
        let executor = Executor::new(api, &config.executor);
        info!(
            "Pilot initialized: operation timeout {:?}, run timeout {:?}",
            config.executor.operation_timeout(),
            config.executor.run_timeout()
        );
        Self { config, executor }
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Validate `desired` and plan the update from `observed`
    pub fn plan(&self, desired: &Topology, observed: &Topology) -> Reconciliation {
        let reconciliation = plan_update(desired, observed);
        for diagnostic in &reconciliation.diagnostics {
            warn!("{}", diagnostic);
        }
        info!("Planned {} operations", reconciliation.plan.len());
        reconciliation
    }

    /// Run context honoring the configured run timeout
    pub fn run_context(&self, cancel: CancelSignal) -> RunContext {
        let ctx = RunContext::new().with_cancel(cancel);
        match self.config.executor.run_timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Plan and execute
    ///
    /// A plan with error diagnostics is never executed; the diagnostics are
    /// returned instead.
    pub async fn apply(
        &self,
        desired: &Topology,
        observed: &Topology,
        ctx: &RunContext,
    ) -> Result<ExecutionReport, Diagnostics> {
        let Reconciliation { plan, diagnostics } = self.plan(desired, observed);
        let plan = diagnostics.clone().into_result(plan)?;

        let mut report = self.executor.execute(&plan, ctx).await;
        let mut all = diagnostics;
        all.extend(report.diagnostics);
        report.diagnostics = all;
        Ok(report)
    }
}
