/// Node registry.
///
/// Authoritative mapping from node ID to node record. Enforces ID uniqueness
/// and tracks the aggregate counts the protocol derives its round bound from:
/// `max_rounds = traitor_count + 1`.
///
/// The registry does NOT validate the N > 3t precondition; that belongs to
/// the driver, which knows the intended fault bound before registering.

use crate::error::{ProtocolError, Result};
use crate::message::MessageLog;
use crate::types::{Decision, NodeId, Role, Round};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// A registered participant.
///
/// Identity and loyalty are fixed at registration and immutable for the life
/// of the run. The message log is exclusively owned by this node; its lock
/// serializes concurrent deliveries to the same node while deliveries to
/// different nodes proceed fully in parallel.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    pub is_traitor: bool,
    log: Mutex<MessageLog>,
}

impl Node {
    fn new(id: NodeId, role: Role, is_traitor: bool) -> Self {
        Self {
            id,
            role,
            is_traitor,
            log: Mutex::new(MessageLog::new()),
        }
    }

    pub fn is_loyal(&self) -> bool {
        !self.is_traitor
    }

    /// Record a delivered value under `(round, sender)`.
    pub async fn record(&self, round: Round, sender: NodeId, value: Decision) {
        self.log.lock().await.append(round, sender, value);
    }

    /// Snapshot of the log at this moment. Readers work on the copy so no
    /// log lock is held across decision computations.
    pub async fn log_snapshot(&self) -> MessageLog {
        self.log.lock().await.clone()
    }
}

#[derive(Default)]
struct RegistryState {
    nodes: HashMap<NodeId, Arc<Node>>,
    traitor_count: i32,
}

/// Shared, concurrently accessible node registry.
#[derive(Default)]
pub struct NodeRegistry {
    state: RwLock<RegistryState>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new node. Fails with `DuplicateNode` if the ID is taken,
    /// leaving the registry unchanged. Returns the total registered count.
    pub async fn register(&self, id: NodeId, role: Role, is_traitor: bool) -> Result<i32> {
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&id) {
            return Err(ProtocolError::DuplicateNode(id));
        }

        state.nodes.insert(id, Arc::new(Node::new(id, role, is_traitor)));
        if is_traitor {
            state.traitor_count += 1;
        }

        let total = state.nodes.len() as i32;
        info!(id, %role, is_traitor, total, "registered general");
        Ok(total)
    }

    pub async fn lookup(&self, id: NodeId) -> Option<Arc<Node>> {
        self.state.read().await.nodes.get(&id).cloned()
    }

    /// Resolve both endpoints of a delivery, distinguishing which side is
    /// missing so the rejection names the right party.
    pub async fn endpoints(
        &self,
        sender: NodeId,
        receiver: NodeId,
    ) -> Result<(Arc<Node>, Arc<Node>)> {
        let state = self.state.read().await;
        let sender = state
            .nodes
            .get(&sender)
            .cloned()
            .ok_or(ProtocolError::UnknownSender(sender))?;
        let receiver = state
            .nodes
            .get(&receiver)
            .cloned()
            .ok_or(ProtocolError::UnknownReceiver(receiver))?;
        Ok((sender, receiver))
    }

    /// All registered nodes, ordered by ID.
    pub async fn snapshot(&self) -> Vec<Arc<Node>> {
        let state = self.state.read().await;
        let mut nodes: Vec<_> = state.nodes.values().cloned().collect();
        nodes.sort_by_key(|node| node.id);
        nodes
    }

    pub async fn total_registered(&self) -> i32 {
        self.state.read().await.nodes.len() as i32
    }

    pub async fn traitor_count(&self) -> i32 {
        self.state.read().await.traitor_count
    }

    /// Number of exchange rounds the protocol runs: t + 1 for t registered
    /// traitors.
    pub async fn max_rounds(&self) -> Round {
        self.state.read().await.traitor_count + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.register(0, Role::Commander, false).await.unwrap(), 1);
        assert_eq!(registry.register(1, Role::Lieutenant, false).await.unwrap(), 2);

        let node = registry.lookup(0).await.unwrap();
        assert_eq!(node.role, Role::Commander);
        assert!(node.is_loyal());
        assert!(registry.lookup(9).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = NodeRegistry::new();
        registry.register(2, Role::Lieutenant, false).await.unwrap();

        let err = registry.register(2, Role::Lieutenant, true).await.unwrap_err();
        assert_eq!(err, ProtocolError::DuplicateNode(2));

        // Registry unchanged: count stays at one and the original record wins.
        assert_eq!(registry.total_registered().await, 1);
        assert!(registry.lookup(2).await.unwrap().is_loyal());
        assert_eq!(registry.traitor_count().await, 0);
    }

    #[tokio::test]
    async fn test_max_rounds_tracks_traitor_count() {
        let registry = NodeRegistry::new();
        registry.register(0, Role::Commander, false).await.unwrap();
        assert_eq!(registry.max_rounds().await, 1);

        registry.register(1, Role::Lieutenant, true).await.unwrap();
        assert_eq!(registry.max_rounds().await, 2);

        registry.register(2, Role::Lieutenant, true).await.unwrap();
        assert_eq!(registry.max_rounds().await, 3);
    }

    #[tokio::test]
    async fn test_endpoints_names_missing_side() {
        let registry = NodeRegistry::new();
        registry.register(0, Role::Commander, false).await.unwrap();

        let err = registry.endpoints(7, 0).await.unwrap_err();
        assert_eq!(err, ProtocolError::UnknownSender(7));

        let err = registry.endpoints(0, 7).await.unwrap_err();
        assert_eq!(err, ProtocolError::UnknownReceiver(7));

        assert!(registry.endpoints(0, 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_ordered_by_id() {
        let registry = NodeRegistry::new();
        registry.register(3, Role::Lieutenant, false).await.unwrap();
        registry.register(0, Role::Commander, false).await.unwrap();
        registry.register(1, Role::Lieutenant, false).await.unwrap();

        let ids: Vec<_> = registry.snapshot().await.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }
}
