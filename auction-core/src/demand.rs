//! Best responses, tie sets, and the per-round assignment.

use std::collections::BTreeMap;

use crate::error::{AuctionError, Result};
use crate::graph::ValuationGraph;
use crate::matching::Matching;
use crate::types::{BuyerId, MarketId, Utility};
use crate::valuation::NetUtilities;

#[derive(Debug, Clone, PartialEq)]
pub struct BestResponse {
    pub buyer: BuyerId,
    /// Highest net utility over the buyer's edges.
    pub utility: Utility,
    /// Every market reaching `utility`, ascending. Never empty.
    pub ties: Vec<MarketId>,
}

impl BestResponse {
    /// The single best edge: lowest market id among the ties.
    pub fn market(&self) -> MarketId {
        self.ties[0]
    }

    pub fn is_tied(&self) -> bool {
        self.ties.len() > 1
    }
}

impl AsRef<[MarketId]> for BestResponse {
    fn as_ref(&self) -> &[MarketId] {
        &self.ties
    }
}

/// Best responses of all buyers, indexed by buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    responses: Vec<BestResponse>,
}

impl Demand {
    pub fn responses(&self) -> &[BestResponse] {
        &self.responses
    }

    pub fn of(&self, buyer: BuyerId) -> &BestResponse {
        &self.responses[buyer.index()]
    }
}

/// Maximize net utility per buyer. Utilities compare with exact equality, so
/// integer instances tie exactly when the arithmetic says they do.
pub fn resolve_demand(graph: &ValuationGraph, net: &NetUtilities) -> Result<Demand> {
    let responses = net
        .buyers()
        .map(|(buyer, row)| {
            let best = row
                .iter()
                .map(|&(_, u)| u)
                .fold(None, |best: Option<Utility>, u| match best {
                    Some(b) if b >= u => Some(b),
                    _ => Some(u),
                });
            let Some(utility) = best else {
                return Err(AuctionError::IsolatedBuyer {
                    buyer: graph.buyer(buyer).label.clone(),
                });
            };
            let mut ties: Vec<MarketId> = row
                .iter()
                .filter(|&&(_, u)| u == utility)
                .map(|&(m, _)| m)
                .collect();
            ties.sort();
            Ok(BestResponse {
                buyer,
                utility,
                ties,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Demand { responses })
}

// ============================================================================
// Assignment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub buyer: BuyerId,
    pub market: MarketId,
    pub utility: Utility,
    /// False when the buyer could not get a market of its own this round and
    /// fell back to its lowest-id best response.
    pub seated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    choices: Vec<Choice>,
    matching: Matching,
}

impl Assignment {
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn choice(&self, buyer: BuyerId) -> &Choice {
        &self.choices[buyer.index()]
    }

    pub fn matching(&self) -> &Matching {
        &self.matching
    }

    /// Number of buyers choosing each market.
    pub fn claims(&self) -> BTreeMap<MarketId, usize> {
        let mut claims = BTreeMap::new();
        for choice in &self.choices {
            *claims.entry(choice.market).or_insert(0) += 1;
        }
        claims
    }

    pub fn seated_count(&self) -> usize {
        self.choices.iter().filter(|c| c.seated).count()
    }
}

/// Pick one market per buyer from its tie set.
///
/// Buyers are seated through a maximum matching of the demand graph (see
/// `Matching::maximum` for the order), so whenever the ties admit a market per
/// buyer, every buyer gets one. A buyer left over takes its lowest-id best
/// response, which is then claimed twice.
pub fn assign(demand: &Demand, market_count: usize) -> Assignment {
    let matching = Matching::maximum(market_count, demand.responses());
    let choices = demand
        .responses()
        .iter()
        .map(|response| {
            let (market, seated) = match matching.market_of(response.buyer) {
                Some(market) => (market, true),
                None => (response.market(), false),
            };
            Choice {
                buyer: response.buyer,
                market,
                utility: response.utility,
                seated,
            }
        })
        .collect();
    Assignment { choices, matching }
}
