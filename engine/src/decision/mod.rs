/// Per-node decision function.
///
/// Reduces a node's accumulated message log into a single final decision.
/// Traitors do not run the honest algorithm; their output is arbitrary and
/// recorded only for vote tallies, never trusted by the verifier.

use crate::registry::Node;
use crate::types::{Decision, Role, Round};
use rand::Rng;
use std::sync::Arc;

/// Compute `node`'s final decision over rounds `1..=max_rounds`.
///
/// `peers` is the full node set; it is consulted only on the degenerate
/// commander fallback path (an empty commander log means no broadcast ever
/// happened, so the commander adopts whatever a lieutenant recorded from it
/// in round 1, and Retreat if no such record exists either).
pub async fn decide(node: &Node, max_rounds: Round, peers: &[Arc<Node>]) -> Decision {
    if node.is_traitor {
        // Arbitrary output, unconstrained by the log.
        return if rand::thread_rng().gen_bool(0.5) {
            Decision::Attack
        } else {
            Decision::Retreat
        };
    }

    let tally = node.log_snapshot().await.tally(max_rounds);

    if node.role == Role::Commander && tally.is_empty() {
        for peer in peers {
            if peer.id == node.id || peer.role != Role::Lieutenant {
                continue;
            }
            if let Some(value) = peer.log_snapshot().await.first_from(1, node.id) {
                return value;
            }
        }
        return Decision::Retreat;
    }

    tally.majority()
}
