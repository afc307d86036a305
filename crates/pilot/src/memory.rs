//! In-memory control plane
//!
//! Holds a topology in memory and applies accepted operations to it from
//! spawned tasks after a configurable latency. Used by `pilot apply
//! --simulate` and by tests; faults can be injected per entity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use topology::model::paths;
use topology::{Entity, EntityRef, FieldMask, OperationKind, Resources, Topology};

use crate::config::ControlConfig;
use crate::control::{ClusterControlApi, ControlError, OperationCompleter, OperationHandle};

/// Fault injected for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Refuse the request when it is issued
    Reject,
    /// Fail the transport before the request is accepted
    Unavailable,
    /// Accept the request, then report failure
    FailOnCompletion,
    /// Accept the request and never complete it
    Hang,
}

/// One call received by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCall {
    pub kind: OperationKind,
    pub target: EntityRef,
    pub field_mask: FieldMask,
}

impl std::fmt::Display for ControlCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field_mask.is_empty() {
            write!(f, "{} {}", self.kind, self.target)
        } else {
            write!(f, "{} {} [{}]", self.kind, self.target, self.field_mask)
        }
    }
}

/// Simulated cluster control plane
pub struct InMemoryControlPlane {
    state: Arc<RwLock<Topology>>,
    calls: Mutex<Vec<ControlCall>>,
    faults: Mutex<HashMap<EntityRef, Fault>>,
    /// Completers of hung operations, kept so their handles stay pending
    hung: Mutex<Vec<OperationCompleter>>,
    latency: Duration,
    next_id: AtomicU64,
}

impl InMemoryControlPlane {
    pub fn new(observed: Topology) -> Self {
        Self {
            state: Arc::new(RwLock::new(observed)),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
            hung: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(observed: Topology, config: &ControlConfig) -> Self {
        Self::new(observed).with_latency(config.simulated_latency())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Inject a fault for every call targeting `target`
    pub fn inject(&self, target: EntityRef, fault: Fault) {
        self.faults.lock().insert(target, fault);
    }

    /// Current topology
    pub async fn snapshot(&self) -> Topology {
        self.state.read().await.clone()
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().clone()
    }

    fn record(&self, kind: OperationKind, target: &EntityRef, field_mask: &FieldMask) {
        self.calls.lock().push(ControlCall {
            kind,
            target: target.clone(),
            field_mask: field_mask.clone(),
        });
    }

    fn next_operation_id(&self) -> String {
        format!("op-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Apply an injected fault that acts before acceptance
    fn check_fault(&self, target: &EntityRef) -> Result<Option<Fault>, ControlError> {
        match self.faults.lock().get(target).copied() {
            Some(Fault::Reject) => Err(ControlError::Rejected {
                target: target.clone(),
                reason: "injected fault".to_string(),
            }),
            Some(Fault::Unavailable) => {
                Err(ControlError::Transport("control plane unavailable".to_string()))
            }
            other => Ok(other),
        }
    }

    /// Accept a change and apply it in the background
    fn accept(&self, target: &EntityRef, fault: Option<Fault>, change: Change) -> OperationHandle {
        let (handle, completer) = OperationHandle::pending(self.next_operation_id());
        debug!("Accepted {} as {}", target, completer.id());

        if fault == Some(Fault::Hang) {
            self.hung.lock().push(completer);
            return handle;
        }

        let state = self.state.clone();
        let latency = self.latency;
        let target = target.clone();
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fault == Some(Fault::FailOnCompletion) {
                warn!("Operation {} on {} failed", completer.id(), target);
                let reason = "injected failure".to_string();
                let operation_id = completer.id().to_string();
                completer.complete(Err(ControlError::Failed { operation_id, reason }));
                return;
            }
            let mut state = state.write().await;
            match change {
                Change::Upsert(entity) => state.upsert(entity),
                Change::Remove => {
                    state.remove(target.kind, &target.name);
                }
            }
            info!("Operation {} on {} done", completer.id(), target);
            completer.complete(Ok(()));
        });
        handle
    }
}

enum Change {
    Upsert(Entity),
    Remove,
}

#[async_trait]
impl ClusterControlApi for InMemoryControlPlane {
    async fn create(&self, entity: &Entity) -> Result<OperationHandle, ControlError> {
        let target = entity.entity_ref();
        self.record(OperationKind::Create, &target, &FieldMask::new());
        let fault = self.check_fault(&target)?;

        if self.state.read().await.get(target.kind, &target.name).is_some() {
            return Err(ControlError::AlreadyExists(target));
        }
        Ok(self.accept(&target, fault, Change::Upsert(entity.clone())))
    }

    async fn update(
        &self,
        target: &EntityRef,
        field_mask: &FieldMask,
        entity: &Entity,
    ) -> Result<OperationHandle, ControlError> {
        self.record(OperationKind::Update, target, field_mask);
        let fault = self.check_fault(target)?;

        let rejected = |reason: String| ControlError::Rejected {
            target: target.clone(),
            reason,
        };

        if entity.entity_ref() != *target {
            return Err(rejected(format!("entity {} does not match target", entity.entity_ref())));
        }

        let state = self.state.read().await;
        let current = state
            .get(target.kind, &target.name)
            .ok_or_else(|| ControlError::NotFound(target.clone()))?;
        let next = apply_mask(&current, entity, field_mask).map_err(rejected)?;

        let mut after = state.clone();
        after.upsert(next.clone());
        check_manager_hosts(&state, &after).map_err(rejected)?;
        drop(state);

        Ok(self.accept(target, fault, Change::Upsert(next)))
    }

    async fn delete(&self, target: &EntityRef) -> Result<OperationHandle, ControlError> {
        self.record(OperationKind::Delete, target, &FieldMask::new());
        let fault = self.check_fault(target)?;

        let state = self.state.read().await;
        if state.get(target.kind, &target.name).is_none() {
            return Err(ControlError::NotFound(target.clone()));
        }
        let mut after = state.clone();
        after.remove(target.kind, &target.name);
        check_manager_hosts(&state, &after).map_err(|reason| ControlError::Rejected {
            target: target.clone(),
            reason,
        })?;
        drop(state);

        Ok(self.accept(target, fault, Change::Remove))
    }
}

/// The control plane never lets the last manager hosts go
fn check_manager_hosts(before: &Topology, after: &Topology) -> Result<(), String> {
    if before.manager_hosts() > 0 && after.manager_hosts() == 0 {
        return Err("change would leave the cluster without manager hosts".to_string());
    }
    Ok(())
}

/// Copy the masked fields of `desired` onto `current`
fn apply_mask(current: &Entity, desired: &Entity, mask: &FieldMask) -> Result<Entity, String> {
    let next = match (current, desired) {
        (Entity::NodeGroup(cur), Entity::NodeGroup(want)) => {
            let mut next = cur.clone();
            for path in mask.iter() {
                match path {
                    paths::HOSTS_COUNT => next.hosts_count = want.hosts_count,
                    paths::ROLES => next.roles = want.roles.clone(),
                    paths::ZONE_IDS => next.zone_ids = want.zone_ids.clone(),
                    paths::SUBNET_IDS => next.subnet_ids = want.subnet_ids.clone(),
                    paths::ASSIGN_PUBLIC_IP => next.assign_public_ip = want.assign_public_ip,
                    other => {
                        apply_resource_path(&mut next.resources, want.resources.as_ref(), other)?
                    }
                }
            }
            Entity::from(next)
        }
        (Entity::Shard(cur), Entity::Shard(want)) => {
            let mut next = cur.clone();
            for path in mask.iter() {
                match path {
                    paths::WEIGHT => next.weight = want.weight,
                    other => {
                        apply_resource_path(&mut next.resources, want.resources.as_ref(), other)?
                    }
                }
            }
            Entity::from(next)
        }
        (Entity::ShardGroup(cur), Entity::ShardGroup(want)) => {
            let mut next = cur.clone();
            for path in mask.iter() {
                match path {
                    paths::DESCRIPTION => next.description = want.description.clone(),
                    paths::SHARD_NAMES => next.shard_names = want.shard_names.clone(),
                    other => return Err(unknown_path(other)),
                }
            }
            Entity::from(next)
        }
        (Entity::FormatSchema(cur), Entity::FormatSchema(want)) => {
            let mut next = cur.clone();
            for path in mask.iter() {
                match path {
                    paths::URI => next.uri = want.uri.clone(),
                    other => return Err(unknown_path(other)),
                }
            }
            Entity::from(next)
        }
        (Entity::MlModel(cur), Entity::MlModel(want)) => {
            let mut next = cur.clone();
            for path in mask.iter() {
                match path {
                    paths::URI => next.uri = want.uri.clone(),
                    other => return Err(unknown_path(other)),
                }
            }
            Entity::from(next)
        }
        _ => return Err(format!("cannot update {} with a {}", current.kind(), desired.kind())),
    };
    Ok(next)
}

fn apply_resource_path(
    current: &mut Option<Resources>,
    desired: Option<&Resources>,
    path: &str,
) -> Result<(), String> {
    if ![paths::RESOURCE_PRESET_ID, paths::DISK_TYPE_ID, paths::DISK_SIZE].contains(&path) {
        return Err(unknown_path(path));
    }
    let Some(want) = desired else {
        return Err(format!("{} is in the mask but resources are not set", path));
    };
    let Some(cur) = current.as_mut() else {
        // no resources yet: the whole descriptor is set at once
        *current = Some(want.clone());
        return Ok(());
    };
    match path {
        paths::RESOURCE_PRESET_ID => cur.resource_preset_id = want.resource_preset_id.clone(),
        paths::DISK_TYPE_ID => cur.disk_type_id = want.disk_type_id.clone(),
        _ => cur.disk_size = want.disk_size,
    }
    Ok(())
}

fn unknown_path(path: &str) -> String {
    format!("unknown field path '{}'", path)
}
