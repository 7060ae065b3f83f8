/// Byzantine Generals Consensus Engine
///
/// Implements the oral-message (OM(t)-style) agreement protocol:
/// - Node registry with loyalty tracking and the t+1 round bound
/// - Multi-round message exchange with cycle rejection and traitor tampering
/// - Per-node majority decision with a deterministic Retreat tie-break
/// - Global consensus verification over the loyal node set
///
/// Agreement among loyal nodes is guaranteed for N > 3t; validating that
/// precondition is the driver's job, not the engine's.

pub mod decision;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod message;
pub mod registry;
pub mod types;
pub mod verifier;


pub use engine::{ConsensusEngine, DecisionResponse, DeliveryResponse, RegisterResponse};
pub use error::ProtocolError;
pub use exchange::{AlwaysFlip, CoinFlip, NeverFlip, TamperPolicy};
pub use types::{Decision, NodeId, Role, Round};
pub use verifier::ConsensusReport;
