/// Scenario fixtures
///
/// A `Roster` describes one simulated run declaratively: how many generals
/// participate and which IDs are traitors. ID 0 is the commander by
/// convention; lieutenants are 1..generals.

#[derive(Debug, Clone)]
pub struct Roster {
    pub generals: i32,
    pub traitors: Vec<i32>,
}

impl Roster {
    /// All-loyal roster.
    pub fn loyal(generals: i32) -> Self {
        Self {
            generals,
            traitors: Vec::new(),
        }
    }

    pub fn with_traitors(generals: i32, traitors: &[i32]) -> Self {
        Self {
            generals,
            traitors: traitors.to_vec(),
        }
    }

    pub fn is_traitor(&self, id: i32) -> bool {
        self.traitors.contains(&id)
    }

    pub fn lieutenants(&self) -> impl Iterator<Item = i32> {
        1..self.generals
    }

    /// The oral-message correctness precondition: N > 3t.
    pub fn satisfies_fault_bound(&self) -> bool {
        self.generals > 3 * self.traitors.len() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_bound() {
        assert!(Roster::loyal(4).satisfies_fault_bound());
        assert!(Roster::with_traitors(4, &[3]).satisfies_fault_bound());
        assert!(!Roster::with_traitors(6, &[1, 2]).satisfies_fault_bound());
    }

    #[test]
    fn test_lieutenants_exclude_commander() {
        let roster = Roster::loyal(4);
        assert_eq!(roster.lieutenants().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
