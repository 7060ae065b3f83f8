/// Core protocol types shared by every engine component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier assigned by the driver. ID 0 is the commander by convention.
pub type NodeId = i32;

/// Exchange round number. Round 1 is the commander's initial broadcast.
pub type Round = i32;

/// The binary order the generals must agree on.
///
/// Nothing else is a valid decision value; malformed input is a protocol
/// error, not a third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Attack,
    Retreat,
}

impl Decision {
    /// The opposite order. Tampering by a traitor is always a flip.
    pub fn flipped(self) -> Self {
        match self {
            Decision::Attack => Decision::Retreat,
            Decision::Retreat => Decision::Attack,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Attack => write!(f, "ATTACK"),
            Decision::Retreat => write!(f, "RETREAT"),
        }
    }
}

/// Role of a registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Commander,
    Lieutenant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Commander => write!(f, "COMMANDER"),
            Role::Lieutenant => write!(f, "LIEUTENANT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_is_involution() {
        assert_eq!(Decision::Attack.flipped(), Decision::Retreat);
        assert_eq!(Decision::Retreat.flipped(), Decision::Attack);
        assert_eq!(Decision::Attack.flipped().flipped(), Decision::Attack);
    }

    #[test]
    fn test_display() {
        assert_eq!(Decision::Attack.to_string(), "ATTACK");
        assert_eq!(Decision::Retreat.to_string(), "RETREAT");
        assert_eq!(Role::Commander.to_string(), "COMMANDER");
        assert_eq!(Role::Lieutenant.to_string(), "LIEUTENANT");
    }
}
