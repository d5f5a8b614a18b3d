use std::collections::BTreeSet;

use crate::demand::Assignment;
use crate::types::MarketId;

/// Markets chosen by two or more buyers in `assignment`. These are the
/// markets whose price rises this round; empty iff every choice is distinct.
pub fn constricted_set(assignment: &Assignment) -> BTreeSet<MarketId> {
    assignment
        .claims()
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(m, _)| m)
        .collect()
}
