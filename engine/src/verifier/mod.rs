/// Consensus verification.
///
/// Aggregates every node's decision, computes the vote tallies, and checks
/// whether all loyal nodes agree. Traitor decisions are reported in the
/// tallies but excluded from the agreement check.

use crate::decision;
use crate::registry::Node;
use crate::types::{Decision, NodeId, Round};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Outcome of one verification pass over the full node set.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusReport {
    /// Every node's individual decision.
    pub decisions: BTreeMap<NodeId, Decision>,

    /// Reference decision: the majority among loyal nodes.
    pub consensus_decision: Decision,

    /// Votes across all nodes.
    pub attack_count: i32,
    pub retreat_count: i32,

    /// Votes restricted to loyal nodes.
    pub loyal_attack_count: i32,
    pub loyal_retreat_count: i32,

    /// True iff every loyal node decided the reference decision.
    pub consensus_reached: bool,
}

impl ConsensusReport {
    /// Vote counts keyed the way the external interface reports them.
    pub fn vote_counts(&self) -> BTreeMap<String, i32> {
        BTreeMap::from([
            ("ATTACK".to_string(), self.attack_count),
            ("RETREAT".to_string(), self.retreat_count),
            ("LOYAL_ATTACK".to_string(), self.loyal_attack_count),
            ("LOYAL_RETREAT".to_string(), self.loyal_retreat_count),
        ])
    }

    /// Human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Total votes - Attack: {}, Retreat: {}",
            self.attack_count, self.retreat_count
        );
        let _ = writeln!(
            out,
            "Loyal votes - Attack: {}, Retreat: {}",
            self.loyal_attack_count, self.loyal_retreat_count
        );
        if self.consensus_reached {
            let _ = writeln!(
                out,
                "CONSENSUS REACHED: All loyal generals agreed on: {}",
                self.consensus_decision
            );
        } else {
            let _ = writeln!(out, "CONSENSUS FAILED: Loyal generals did not reach agreement");
        }
        out
    }
}

/// Compute each node's decision once and derive the aggregate verdict.
pub async fn verify(nodes: &[Arc<Node>], max_rounds: Round) -> ConsensusReport {
    let mut decisions = BTreeMap::new();
    let mut attack_count = 0;
    let mut retreat_count = 0;
    let mut loyal_attack_count = 0;
    let mut loyal_retreat_count = 0;

    for node in nodes {
        let verdict = decision::decide(node, max_rounds, nodes).await;
        decisions.insert(node.id, verdict);
        match verdict {
            Decision::Attack => {
                attack_count += 1;
                if node.is_loyal() {
                    loyal_attack_count += 1;
                }
            }
            Decision::Retreat => {
                retreat_count += 1;
                if node.is_loyal() {
                    loyal_retreat_count += 1;
                }
            }
        }
    }

    let consensus_decision = if loyal_attack_count > loyal_retreat_count {
        Decision::Attack
    } else {
        Decision::Retreat
    };

    let consensus_reached = nodes
        .iter()
        .filter(|node| node.is_loyal())
        .all(|node| decisions[&node.id] == consensus_decision);

    ConsensusReport {
        decisions,
        consensus_decision,
        attack_count,
        retreat_count,
        loyal_attack_count,
        loyal_retreat_count,
        consensus_reached,
    }
}
