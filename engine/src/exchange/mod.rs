/// Oral-message exchange protocol.
///
/// Implements the round state machine and the two message primitives that
/// populate the nodes' message logs: the commander's initial order broadcast
/// (round 1) and the peer-to-peer value exchange (rounds 2..=t+1). Both
/// primitives route through the same traitor tampering seam.
///
/// The shared round counter only ever moves forward: the first accepted
/// message carrying round k activates round k, and anything tagged with an
/// earlier round is rejected as stale.

use crate::error::{ProtocolError, Result};
use crate::registry::{Node, NodeRegistry};
use crate::types::{Decision, NodeId, Role, Round};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Strategy a traitorous sender applies to each delivery.
///
/// Invoked once per delivery, only when the sender is a traitor; loyal
/// senders never go through it. Injectable so tests can replace the coin
/// flip with a deterministic policy.
pub trait TamperPolicy: Send + Sync {
    fn tamper(&self, value: Decision) -> Decision;
}

/// Default adversarial behavior: flip the value with probability 1/2,
/// independently per delivery. A traitor is not required to lie
/// consistently.
#[derive(Debug, Default)]
pub struct CoinFlip;

impl TamperPolicy for CoinFlip {
    fn tamper(&self, value: Decision) -> Decision {
        if rand::thread_rng().gen_bool(0.5) {
            value.flipped()
        } else {
            value
        }
    }
}

/// Deterministic policy: traitors always relay the opposite value.
#[derive(Debug, Default)]
pub struct AlwaysFlip;

impl TamperPolicy for AlwaysFlip {
    fn tamper(&self, value: Decision) -> Decision {
        value.flipped()
    }
}

/// Deterministic policy: traitors relay truthfully.
#[derive(Debug, Default)]
pub struct NeverFlip;

impl TamperPolicy for NeverFlip {
    fn tamper(&self, value: Decision) -> Decision {
        value
    }
}

/// Process-wide round counter shared by all nodes.
///
/// Exposes only read and advance-if-greater; the raw value is never handed
/// out for unguarded mutation. Round 0 means no round has started.
#[derive(Default)]
struct RoundCounter {
    current: Mutex<Round>,
}

impl RoundCounter {
    async fn current(&self) -> Round {
        *self.current.lock().await
    }

    /// Accept or reject a message tagged with `round`. Stale rounds are
    /// rejected; a larger round advances the counter.
    async fn observe(&self, round: Round) -> Result<()> {
        let mut current = self.current.lock().await;
        if round < *current {
            return Err(ProtocolError::StaleRound {
                round,
                current: *current,
            });
        }
        if round > *current {
            *current = round;
            info!(round, "round started");
        }
        Ok(())
    }

    /// Transition out of the idle state on the first initial order.
    async fn begin(&self) {
        let mut current = self.current.lock().await;
        if *current == 0 {
            *current = 1;
            info!("round 1 started: commander broadcasting orders");
        }
    }
}

/// The exchange protocol state machine.
pub struct ExchangeProtocol {
    registry: Arc<NodeRegistry>,
    rounds: RoundCounter,
    tamper: Box<dyn TamperPolicy>,
}

impl ExchangeProtocol {
    /// Protocol with the default coin-flip tamper policy.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_tamper_policy(registry, Box::new(CoinFlip))
    }

    pub fn with_tamper_policy(registry: Arc<NodeRegistry>, tamper: Box<dyn TamperPolicy>) -> Self {
        Self {
            registry,
            rounds: RoundCounter::default(),
            tamper,
        }
    }

    /// Currently active round (0 before any message is accepted).
    pub async fn current_round(&self) -> Round {
        self.rounds.current().await
    }

    /// Commander's initial order broadcast (round 1).
    ///
    /// The order is first written into the commander's own log under its own
    /// sender key, unconditionally, so the commander always remembers what it
    /// originally ordered. The receiver then gets a possibly tampered copy.
    pub async fn send_initial_order(
        &self,
        sender_id: NodeId,
        receiver_id: NodeId,
        order: Decision,
    ) -> Result<()> {
        let (sender, receiver) = self.registry.endpoints(sender_id, receiver_id).await?;
        if sender.role != Role::Commander {
            return Err(ProtocolError::NotCommander(sender_id));
        }

        sender.record(1, sender_id, order).await;

        let delivered = self.deliver_value(&sender, order);
        receiver.record(1, sender_id, delivered).await;
        self.rounds.begin().await;

        debug!(sender = sender_id, receiver = receiver_id, %delivered, "order delivered");
        Ok(())
    }

    /// Peer-to-peer value exchange for rounds after the broadcast.
    ///
    /// `path` is the relay chain the value has traveled; a delivery whose
    /// receiver already appears in it is rejected, which is the only bound on
    /// relay amplification.
    pub async fn exchange(
        &self,
        round: Round,
        sender_id: NodeId,
        receiver_id: NodeId,
        value: Decision,
        path: &[NodeId],
    ) -> Result<()> {
        let (sender, receiver) = self.registry.endpoints(sender_id, receiver_id).await?;

        self.rounds.observe(round).await?;

        if path.contains(&receiver_id) {
            warn!(round, sender = sender_id, receiver = receiver_id, ?path, "cyclic relay rejected");
            return Err(ProtocolError::CyclicPath { receiver: receiver_id });
        }

        let delivered = self.deliver_value(&sender, value);
        receiver.record(round, sender_id, delivered).await;

        debug!(round, sender = sender_id, receiver = receiver_id, %delivered, "message recorded");
        Ok(())
    }

    /// Tampering seam: loyal senders deliver faithfully, traitors go through
    /// the injected policy.
    fn deliver_value(&self, sender: &Node, value: Decision) -> Decision {
        if sender.is_loyal() {
            return value;
        }
        let delivered = self.tamper.tamper(value);
        if delivered != value {
            warn!(sender = sender.id, original = %value, %delivered, "traitor tampered with value");
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry_with(nodes: &[(NodeId, Role, bool)]) -> Arc<NodeRegistry> {
        let registry = Arc::new(NodeRegistry::new());
        for (id, role, is_traitor) in nodes {
            registry.register(*id, *role, *is_traitor).await.unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_initial_order_requires_commander() {
        let registry = registry_with(&[
            (0, Role::Commander, false),
            (1, Role::Lieutenant, false),
            (2, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry);

        let err = protocol.send_initial_order(1, 2, Decision::Attack).await.unwrap_err();
        assert_eq!(err, ProtocolError::NotCommander(1));

        assert!(protocol.send_initial_order(0, 1, Decision::Attack).await.is_ok());
        assert_eq!(protocol.current_round().await, 1);
    }

    #[tokio::test]
    async fn test_initial_order_unknown_endpoints() {
        let registry = registry_with(&[(0, Role::Commander, false)]).await;
        let protocol = ExchangeProtocol::new(registry);

        assert_eq!(
            protocol.send_initial_order(9, 0, Decision::Attack).await.unwrap_err(),
            ProtocolError::UnknownSender(9)
        );
        assert_eq!(
            protocol.send_initial_order(0, 9, Decision::Attack).await.unwrap_err(),
            ProtocolError::UnknownReceiver(9)
        );
    }

    #[tokio::test]
    async fn test_initial_order_records_commander_self_entry() {
        let registry = registry_with(&[
            (0, Role::Commander, false),
            (1, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry.clone());

        protocol.send_initial_order(0, 1, Decision::Attack).await.unwrap();

        let commander = registry.lookup(0).await.unwrap();
        let log = commander.log_snapshot().await;
        assert_eq!(log.values(1, 0), &[Decision::Attack]);

        let lieutenant = registry.lookup(1).await.unwrap();
        let log = lieutenant.log_snapshot().await;
        assert_eq!(log.values(1, 0), &[Decision::Attack]);
    }

    #[tokio::test]
    async fn test_stale_round_rejected() {
        let registry = registry_with(&[
            (0, Role::Commander, false),
            (1, Role::Lieutenant, false),
            (2, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry);

        protocol.exchange(3, 1, 2, Decision::Attack, &[1]).await.unwrap();
        assert_eq!(protocol.current_round().await, 3);

        let err = protocol.exchange(2, 2, 1, Decision::Attack, &[2]).await.unwrap_err();
        assert_eq!(err, ProtocolError::StaleRound { round: 2, current: 3 });
    }

    #[tokio::test]
    async fn test_round_advances_to_larger_tag() {
        let registry = registry_with(&[
            (0, Role::Commander, false),
            (1, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry);

        assert_eq!(protocol.current_round().await, 0);
        protocol.exchange(2, 0, 1, Decision::Retreat, &[0]).await.unwrap();
        assert_eq!(protocol.current_round().await, 2);

        // Same round stays accepted.
        protocol.exchange(2, 1, 0, Decision::Retreat, &[1]).await.unwrap();
        assert_eq!(protocol.current_round().await, 2);
    }

    #[tokio::test]
    async fn test_cyclic_path_rejected() {
        let registry = registry_with(&[
            (3, Role::Lieutenant, false),
            (7, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry.clone());

        let err = protocol
            .exchange(2, 7, 3, Decision::Attack, &[3, 7])
            .await
            .unwrap_err();
        assert_eq!(err, ProtocolError::CyclicPath { receiver: 3 });

        // Nothing was recorded for the rejected delivery.
        let receiver = registry.lookup(3).await.unwrap();
        assert!(receiver.log_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_delivery_appends_independent_entries() {
        let registry = registry_with(&[
            (1, Role::Lieutenant, false),
            (2, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::new(registry.clone());

        protocol.exchange(2, 1, 2, Decision::Attack, &[1]).await.unwrap();
        protocol.exchange(2, 1, 2, Decision::Attack, &[1]).await.unwrap();

        let receiver = registry.lookup(2).await.unwrap();
        let log = receiver.log_snapshot().await;
        assert_eq!(log.values(2, 1), &[Decision::Attack, Decision::Attack]);
    }

    #[tokio::test]
    async fn test_traitor_tampering_goes_through_policy() {
        let registry = registry_with(&[
            (0, Role::Commander, true),
            (1, Role::Lieutenant, true),
            (2, Role::Lieutenant, false),
        ])
        .await;
        let protocol = ExchangeProtocol::with_tamper_policy(registry.clone(), Box::new(AlwaysFlip));

        // Traitor commander: receiver sees the flip, the commander's own log
        // keeps the original order.
        protocol.send_initial_order(0, 2, Decision::Attack).await.unwrap();
        let receiver = registry.lookup(2).await.unwrap();
        assert_eq!(receiver.log_snapshot().await.values(1, 0), &[Decision::Retreat]);
        let commander = registry.lookup(0).await.unwrap();
        assert_eq!(commander.log_snapshot().await.values(1, 0), &[Decision::Attack]);

        // Traitor lieutenant relay flips too.
        protocol.exchange(2, 1, 2, Decision::Attack, &[1]).await.unwrap();
        assert_eq!(receiver.log_snapshot().await.values(2, 1), &[Decision::Retreat]);
    }

    #[tokio::test]
    async fn test_loyal_sender_never_tampered() {
        let registry = registry_with(&[
            (0, Role::Commander, false),
            (1, Role::Lieutenant, false),
        ])
        .await;
        // Even an always-flip policy must not touch loyal deliveries.
        let protocol = ExchangeProtocol::with_tamper_policy(registry.clone(), Box::new(AlwaysFlip));

        protocol.send_initial_order(0, 1, Decision::Attack).await.unwrap();
        protocol.exchange(2, 0, 1, Decision::Attack, &[0]).await.unwrap();

        let receiver = registry.lookup(1).await.unwrap();
        let log = receiver.log_snapshot().await;
        assert_eq!(log.values(1, 0), &[Decision::Attack]);
        assert_eq!(log.values(2, 0), &[Decision::Attack]);
    }
}
