//! Convergence verification.
//!
//! After a pass completes, every connected replica should equal canonical
//! state slot for slot. These helpers check that and name the slots that
//! disagree.

use omnipack_core::{CanonicalInventory, ItemStack, ParticipantId, Replica};

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Contents equal canonical state.
    Converged,
    /// Contents differ at these slot indices.
    Diverged { slots: Vec<usize> },
}

impl ConvergenceResult {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Compare a slot list with canonical state.
pub fn verify_slots(canonical: &CanonicalInventory, slots: &[ItemStack]) -> ConvergenceResult {
    if canonical.matches(slots) {
        return ConvergenceResult::Converged;
    }

    let empty = ItemStack::empty();
    let diverged: Vec<usize> = canonical
        .slots()
        .iter()
        .enumerate()
        .filter(|(i, expected)| slots.get(*i).unwrap_or(&empty) != *expected)
        .map(|(i, _)| i)
        .collect();

    if diverged.is_empty() {
        ConvergenceResult::Converged
    } else {
        ConvergenceResult::Diverged { slots: diverged }
    }
}

/// Compare one replica with canonical state.
pub fn verify_replica<R: Replica + ?Sized>(
    canonical: &CanonicalInventory,
    replica: &R,
) -> ConvergenceResult {
    verify_slots(canonical, &replica.snapshot(canonical.len()))
}

/// Check every replica in a roster.
pub fn verify_all<R: Replica>(
    canonical: &CanonicalInventory,
    replicas: &[R],
) -> Vec<(ParticipantId, ConvergenceResult)> {
    replicas
        .iter()
        .map(|r| (r.participant(), verify_replica(canonical, r)))
        .collect()
}

/// True if every replica has converged.
pub fn all_converged<R: Replica>(canonical: &CanonicalInventory, replicas: &[R]) -> bool {
    replicas
        .iter()
        .all(|r| verify_replica(canonical, r).is_converged())
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnipack_core::MemoryReplica;

    #[test]
    fn test_verify_names_diverged_slots() {
        let canonical = CanonicalInventory::from_parts(
            vec![ItemStack::new("minecraft:stone", 1), ItemStack::empty()],
            1,
            3,
        );
        let pid = ParticipantId::from_bytes([1; 16]);

        let same = MemoryReplica::with_slots(pid, canonical.slots().to_vec());
        assert!(verify_replica(&canonical, &same).is_converged());

        let mut other = same.clone();
        other.set(0, ItemStack::empty());
        other.set(2, ItemStack::new("minecraft:dirt", 1));
        assert_eq!(
            verify_replica(&canonical, &other),
            ConvergenceResult::Diverged { slots: vec![0, 2] }
        );

        assert!(!all_converged(&canonical, &[same.clone(), other]));
        assert!(all_converged(&canonical, &[same]));
    }

    #[test]
    fn test_verify_all_reports_each_participant() {
        let canonical = CanonicalInventory::new(2);
        let roster = vec![
            MemoryReplica::new(ParticipantId::from_bytes([1; 16]), 2),
            MemoryReplica::new(ParticipantId::from_bytes([2; 16]), 2),
        ];
        let results = verify_all(&canonical, &roster);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_converged()));
    }
}
