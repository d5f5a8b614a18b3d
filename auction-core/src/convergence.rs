use std::collections::HashSet;

use crate::demand::Assignment;
use crate::types::AuctionStatus;

/// True when no market is chosen twice. Buyers and choices are one-to-one,
/// so this makes the assignment a matching that covers every buyer.
pub fn is_perfect_matching(assignment: &Assignment) -> bool {
    let mut taken = HashSet::new();
    assignment.choices().iter().all(|c| taken.insert(c.market))
}

/// Status after evaluating a round. Never `Stalled`; the driver decides that.
pub fn check(assignment: &Assignment) -> AuctionStatus {
    if is_perfect_matching(assignment) {
        AuctionStatus::Converged
    } else {
        AuctionStatus::Searching
    }
}
