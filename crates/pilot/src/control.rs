//! Cluster control API boundary
//!
//! One async call per mutating verb. Each call returns once the control
//! plane has accepted the request; the returned [`OperationHandle`] resolves
//! when the remote operation finishes.

use async_trait::async_trait;
use tokio::sync::oneshot;

use topology::{Entity, EntityRef, FieldMask};

/// Control plane error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("{0} already exists")]
    AlreadyExists(EntityRef),
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error("request for {target} rejected: {reason}")]
    Rejected { target: EntityRef, reason: String },
    #[error("operation {operation_id} failed: {reason}")]
    Failed { operation_id: String, reason: String },
    #[error("operation {0} was abandoned by the control plane")]
    Abandoned(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Mutating surface of the cloud control plane
#[async_trait]
pub trait ClusterControlApi: Send + Sync {
    async fn create(&self, entity: &Entity) -> Result<OperationHandle, ControlError>;

    async fn update(
        &self,
        target: &EntityRef,
        field_mask: &FieldMask,
        entity: &Entity,
    ) -> Result<OperationHandle, ControlError>;

    async fn delete(&self, target: &EntityRef) -> Result<OperationHandle, ControlError>;
}

/// Accepted remote operation
///
/// Resolves through a oneshot channel completed by whoever tracks the
/// remote operation.
#[derive(Debug)]
pub struct OperationHandle {
    id: String,
    completion: oneshot::Receiver<Result<(), ControlError>>,
}

impl OperationHandle {
    /// Create a pending handle and the completer that resolves it
    pub fn pending(id: impl Into<String>) -> (Self, OperationCompleter) {
        let (tx, rx) = oneshot::channel();
        let id = id.into();
        (
            Self {
                id: id.clone(),
                completion: rx,
            },
            OperationCompleter { id, tx },
        )
    }

    /// Create an already resolved handle
    pub fn resolved(id: impl Into<String>, result: Result<(), ControlError>) -> Self {
        let (handle, completer) = Self::pending(id);
        completer.complete(result);
        handle
    }

    /// Remote operation id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the remote operation to finish
    pub async fn wait(self) -> Result<(), ControlError> {
        match self.completion.await {
            Ok(result) => result,
            Err(_) => Err(ControlError::Abandoned(self.id)),
        }
    }
}

/// Resolves an [`OperationHandle`]
#[derive(Debug)]
pub struct OperationCompleter {
    id: String,
    tx: oneshot::Sender<Result<(), ControlError>>,
}

impl OperationCompleter {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn complete(self, result: Result<(), ControlError>) {
        // receiver gone means nobody waits any more
        let _ = self.tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_resolves_with_result() {
        let (handle, completer) = OperationHandle::pending("op-1");
        assert_eq!(handle.id(), "op-1");
        completer.complete(Ok(()));
        assert_eq!(handle.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_completer_abandons() {
        let (handle, completer) = OperationHandle::pending("op-2");
        drop(completer);
        assert_eq!(handle.wait().await, Err(ControlError::Abandoned("op-2".to_string())));
    }
}
