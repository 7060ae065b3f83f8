/// Protocol error taxonomy.
///
/// Every variant is a non-fatal, per-call rejection: the offending message is
/// dropped, the rejection is reported to the caller, and no engine state is
/// corrupted. There are no fatal error conditions inside the engine.

use crate::types::{NodeId, Round};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("general {0} is already registered")]
    DuplicateNode(NodeId),

    #[error("sender general {0} does not exist")]
    UnknownSender(NodeId),

    #[error("receiver general {0} does not exist")]
    UnknownReceiver(NodeId),

    #[error("general {0} does not exist")]
    UnknownNode(NodeId),

    #[error("only the commander can send initial orders, general {0} is not it")]
    NotCommander(NodeId),

    #[error("message for previous round {round} rejected, current round is {current}")]
    StaleRound { round: Round, current: Round },

    #[error("relay path already contains receiver {receiver}, cycle rejected")]
    CyclicPath { receiver: NodeId },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
