//! Status synchronization between the server and a rendered view.
//!
//! [`synchronize`] is the diffing step: it compares each fetched record's
//! status with the last one observed and reports every change as a
//! [`StatusTransition`]. [`Synchronizer`] wraps it with a refresh timer, an
//! in-flight guard, a view to keep current and a notifier.
//!
//! ## Observed-status table
//!
//! - An id seen for the first time is recorded silently. Absence from the
//!   table means "not yet observed" and never produces a transition.
//! - Entries are only written by [`synchronize`].
//! - Entries for records that stop appearing are kept, unless pruning is
//!   enabled with [`ObservedStatusTable::with_pruning`].

mod synchronizer;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::models::{Complaint, ComplaintId, Status, StatusTransition};

pub use synchronizer::{
    DEFAULT_POLL_INTERVAL, PollOutcome, Synchronizer, SynchronizerBuilder, Visibility,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    status: Status,
    /// Consecutive successful fetches this id was absent from
    misses: u32,
}

/// Last-seen status per complaint id.
#[derive(Debug, Clone, Default)]
pub struct ObservedStatusTable {
    entries: HashMap<ComplaintId, Observation>,
    prune_after: Option<u32>,
}

impl ObservedStatusTable {
    /// A table that never forgets an id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that drops an id after it is missing from `misses`
    /// consecutive fetches. Zero disables pruning.
    pub fn with_pruning(misses: u32) -> Self {
        Self {
            entries: HashMap::new(),
            prune_after: Some(misses).filter(|&n| n > 0),
        }
    }

    /// Last observed status for `id`, or `None` if never observed.
    pub fn get(&self, id: ComplaintId) -> Option<Status> {
        self.entries.get(&id).map(|o| o.status)
    }

    pub fn contains(&self, id: ComplaintId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prune_after(&self) -> Option<u32> {
        self.prune_after
    }
}

/// Diff `current` against `observed`, updating the table in place.
///
/// Returns one transition per record whose status differs from the observed
/// one, in the order the records were given. First sightings are recorded
/// without a transition.
pub fn synchronize(
    current: &[Complaint],
    observed: &mut ObservedStatusTable,
) -> Vec<StatusTransition> {
    let mut transitions = Vec::new();

    for complaint in current {
        match observed.entries.entry(complaint.id) {
            Entry::Vacant(slot) => {
                slot.insert(Observation {
                    status: complaint.status,
                    misses: 0,
                });
            }
            Entry::Occupied(mut slot) => {
                let seen = slot.get_mut();
                seen.misses = 0;
                if seen.status != complaint.status {
                    transitions.push(StatusTransition {
                        id: complaint.id,
                        from: seen.status,
                        to: complaint.status,
                    });
                    seen.status = complaint.status;
                }
            }
        }
    }

    if let Some(limit) = observed.prune_after {
        let present: HashSet<ComplaintId> = current.iter().map(|c| c.id).collect();
        observed.entries.retain(|id, seen| {
            if present.contains(id) {
                return true;
            }
            seen.misses += 1;
            seen.misses < limit
        });
    }

    transitions
}


#[cfg(test)]
mod tests {
    use super::testing::record;
    use super::*;

    #[test]
    fn test_first_observation_is_silent() {
        let mut observed = ObservedStatusTable::new();
        let transitions = synchronize(&[record(1, Status::InProgress)], &mut observed);
        assert!(transitions.is_empty());
        assert_eq!(observed.get(1), Some(Status::InProgress));
    }

    #[test]
    fn test_change_is_reported_and_recorded() {
        let mut observed = ObservedStatusTable::new();
        synchronize(&[record(1, Status::Pending)], &mut observed);

        let transitions = synchronize(&[record(1, Status::Resolved)], &mut observed);
        assert_eq!(
            transitions,
            vec![StatusTransition {
                id: 1,
                from: Status::Pending,
                to: Status::Resolved,
            }]
        );
        assert_eq!(observed.get(1), Some(Status::Resolved));
    }

    #[test]
    fn test_repeated_input_is_stable() {
        let mut observed = ObservedStatusTable::new();
        synchronize(&[record(1, Status::Pending)], &mut observed);

        let batch = [record(1, Status::InProgress)];
        assert_eq!(synchronize(&batch, &mut observed).len(), 1);
        assert!(synchronize(&batch, &mut observed).is_empty());
    }

    #[test]
    fn test_transitions_follow_input_order() {
        let mut observed = ObservedStatusTable::new();
        synchronize(
            &[record(1, Status::Pending), record(2, Status::Pending)],
            &mut observed,
        );

        let transitions = synchronize(
            &[record(2, Status::Resolved), record(1, Status::InProgress)],
            &mut observed,
        );
        let ids: Vec<i64> = transitions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(transitions[1].to, Status::InProgress);
    }

    #[test]
    fn test_missing_record_is_tolerated() {
        let mut observed = ObservedStatusTable::new();
        synchronize(
            &[record(1, Status::Pending), record(2, Status::Pending)],
            &mut observed,
        );

        let transitions = synchronize(&[record(2, Status::Pending)], &mut observed);
        assert!(transitions.is_empty());
        // Stale entry is kept
        assert_eq!(observed.get(1), Some(Status::Pending));

        assert!(synchronize(&[], &mut observed).is_empty());
        assert_eq!(observed.len(), 2);
    }

    #[test]
    fn test_duplicate_id_in_one_batch_compares_against_latest() {
        let mut observed = ObservedStatusTable::new();
        synchronize(&[record(1, Status::Pending)], &mut observed);

        let transitions = synchronize(
            &[record(1, Status::InProgress), record(1, Status::Resolved)],
            &mut observed,
        );
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1].from, Status::InProgress);
        assert_eq!(transitions[1].to, Status::Resolved);
    }

    #[test]
    fn test_pruning_after_consecutive_misses() {
        let mut observed = ObservedStatusTable::with_pruning(2);
        synchronize(
            &[record(1, Status::Pending), record(2, Status::Pending)],
            &mut observed,
        );

        synchronize(&[record(2, Status::Pending)], &mut observed);
        assert!(observed.contains(1));

        // Seen again: miss count resets
        synchronize(
            &[record(1, Status::Pending), record(2, Status::Pending)],
            &mut observed,
        );
        synchronize(&[record(2, Status::Pending)], &mut observed);
        assert!(observed.contains(1));

        synchronize(&[record(2, Status::Pending)], &mut observed);
        assert!(!observed.contains(1));

        // Reappearing after pruning is a fresh first sighting
        let transitions = synchronize(&[record(1, Status::Resolved)], &mut observed);
        assert!(transitions.is_empty());
        assert_eq!(observed.get(1), Some(Status::Resolved));
    }

    #[test]
    fn test_zero_disables_pruning() {
        let observed = ObservedStatusTable::with_pruning(0);
        assert_eq!(observed.prune_after(), None);
    }
}
