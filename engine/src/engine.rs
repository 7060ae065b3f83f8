/// Consensus engine façade.
///
/// Ties the registry, exchange protocol, decision function, and verifier
/// together behind the five operations the simulation driver (or a transport
/// layer) calls. Every rejection comes back as a structured failure response,
/// never as an error the caller must unwrap and never as a crash.

use crate::exchange::{ExchangeProtocol, TamperPolicy};
use crate::registry::NodeRegistry;
use crate::types::{Decision, NodeId, Role, Round};
use crate::verifier::{self, ConsensusReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Response to a registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub total_registered: i32,
}

/// Response to an initial order or exchange delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub received: bool,
    pub message: String,
}

/// Response to a decision query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub consensus_reached: bool,
    pub details: String,
    pub vote_counts: BTreeMap<String, i32>,
}

/// The Byzantine Generals consensus engine.
pub struct ConsensusEngine {
    registry: Arc<NodeRegistry>,
    protocol: ExchangeProtocol,
}

impl ConsensusEngine {
    /// Engine with the default coin-flip tamper policy.
    pub fn new() -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let protocol = ExchangeProtocol::new(registry.clone());
        Self { registry, protocol }
    }

    /// Engine with an injected tamper policy (deterministic in tests).
    pub fn with_tamper_policy(tamper: Box<dyn TamperPolicy>) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let protocol = ExchangeProtocol::with_tamper_policy(registry.clone(), tamper);
        Self { registry, protocol }
    }

    /// Register a general. Duplicate IDs are reported, not fatal.
    pub async fn register(&self, id: NodeId, role: Role, is_traitor: bool) -> RegisterResponse {
        match self.registry.register(id, role, is_traitor).await {
            Ok(total) => RegisterResponse {
                success: true,
                message: format!("General {id} registered successfully"),
                total_registered: total,
            },
            Err(err) => {
                warn!(id, %err, "registration rejected");
                RegisterResponse {
                    success: false,
                    message: err.to_string(),
                    total_registered: self.registry.total_registered().await,
                }
            }
        }
    }

    /// Commander's initial order broadcast (round 1).
    pub async fn send_initial_order(
        &self,
        sender_id: NodeId,
        receiver_id: NodeId,
        order: Decision,
    ) -> DeliveryResponse {
        match self.protocol.send_initial_order(sender_id, receiver_id, order).await {
            Ok(()) => DeliveryResponse {
                received: true,
                message: "Order received".to_string(),
            },
            Err(err) => {
                warn!(sender = sender_id, receiver = receiver_id, %err, "order rejected");
                DeliveryResponse {
                    received: false,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Peer-to-peer exchange for rounds 2..=max_rounds.
    pub async fn exchange(
        &self,
        round: Round,
        sender_id: NodeId,
        receiver_id: NodeId,
        value: Decision,
        path: &[NodeId],
    ) -> DeliveryResponse {
        match self.protocol.exchange(round, sender_id, receiver_id, value, path).await {
            Ok(()) => DeliveryResponse {
                received: true,
                message: "Message received".to_string(),
            },
            Err(err) => {
                warn!(round, sender = sender_id, receiver = receiver_id, %err, "message rejected");
                DeliveryResponse {
                    received: false,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Final decision for one general, plus the aggregate consensus verdict.
    ///
    /// An unknown node yields a conservative Retreat with
    /// `consensus_reached = false` and an explanatory detail string.
    pub async fn get_decision(&self, node_id: NodeId) -> DecisionResponse {
        if self.registry.lookup(node_id).await.is_none() {
            return DecisionResponse {
                decision: Decision::Retreat,
                consensus_reached: false,
                details: format!("General {node_id} does not exist"),
                vote_counts: BTreeMap::new(),
            };
        }

        let report = self.report().await;
        let decision = report.decisions[&node_id];
        let mut details = format!("General {node_id} final decision: {decision}\n");
        details.push_str(&report.summary());

        DecisionResponse {
            decision,
            consensus_reached: report.consensus_reached,
            details,
            vote_counts: report.vote_counts(),
        }
    }

    /// Full verification pass over every registered node.
    pub async fn report(&self) -> ConsensusReport {
        let nodes = self.registry.snapshot().await;
        let max_rounds = self.registry.max_rounds().await;
        verifier::verify(&nodes, max_rounds).await
    }

    pub async fn total_registered(&self) -> i32 {
        self.registry.total_registered().await
    }

    /// Round bound for the current roster: registered traitors + 1.
    pub async fn max_rounds(&self) -> Round {
        self.registry.max_rounds().await
    }

    /// Currently active exchange round (0 before the first broadcast).
    pub async fn current_round(&self) -> Round {
        self.protocol.current_round().await
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new()
    }
}
