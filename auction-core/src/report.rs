//! Data handed to renderers and printers. Nothing here feeds back into the
//! auction.

use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::auction::{AuctionOutcome, Round};
use crate::error::Result;
use crate::graph::ValuationGraph;
use crate::state::AuctionState;
use crate::types::{AuctionStatus, BuyerId, MarketId, Price, Utility};
use crate::valuation::{NetUtilities, adjust_valuations};

// ============================================================================
// Snapshot Parts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct EdgeRef {
    pub market: String,
    pub buyer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketPrice {
    pub market: String,
    pub price: Price,
}

/// Net utilities over a buyer's edges in edge order, with the `[a, b, ...]`
/// caption drawn under the buyer node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct BuyerLabel {
    pub buyer: String,
    pub net_utilities: Vec<Utility>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct RoundSnapshot {
    /// 0 for the picture before any round runs.
    pub round: u32,
    pub status: AuctionStatus,
    pub prices: Vec<MarketPrice>,
    /// One edge per buyer: the market it chose.
    pub chosen_edges: Vec<EdgeRef>,
    /// Other edges at a buyer's best net utility.
    pub tie_edges: Vec<EdgeRef>,
    pub buyer_labels: Vec<BuyerLabel>,
}

fn market_prices(graph: &ValuationGraph, prices: &[Price]) -> Vec<MarketPrice> {
    graph
        .markets()
        .iter()
        .map(|m| MarketPrice {
            market: m.label.clone(),
            price: prices.get(m.id.index()).copied().unwrap_or(0),
        })
        .collect()
}

fn buyer_labels(graph: &ValuationGraph, net: &NetUtilities) -> Vec<BuyerLabel> {
    net.buyers()
        .map(|(buyer, row)| {
            let net_utilities: Vec<Utility> = row.iter().map(|&(_, u)| u).collect();
            let caption = format!(
                "[{}]",
                net_utilities
                    .iter()
                    .map(|u| u.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            BuyerLabel {
                buyer: graph.buyer(buyer).label.clone(),
                net_utilities,
                caption,
            }
        })
        .collect()
}

fn edge(graph: &ValuationGraph, market: MarketId, buyer: BuyerId) -> EdgeRef {
    EdgeRef {
        market: graph.market(market).label.clone(),
        buyer: graph.buyer(buyer).label.clone(),
    }
}

impl RoundSnapshot {
    /// Prices and buyer captions before the first round; no edges highlighted.
    pub fn initial(graph: &ValuationGraph, state: &AuctionState) -> Result<Self> {
        let net = adjust_valuations(graph, &state.prices)?;
        Ok(Self {
            round: 0,
            status: AuctionStatus::Searching,
            prices: market_prices(graph, &state.prices),
            chosen_edges: Vec::new(),
            tie_edges: Vec::new(),
            buyer_labels: buyer_labels(graph, &net),
        })
    }

    pub fn from_round(graph: &ValuationGraph, round: &Round) -> Self {
        let chosen_edges = round
            .assignment
            .choices()
            .iter()
            .map(|c| edge(graph, c.market, c.buyer))
            .collect();
        let tie_edges = round
            .assignment
            .choices()
            .iter()
            .flat_map(|c| {
                round
                    .demand
                    .of(c.buyer)
                    .ties
                    .iter()
                    .filter(move |&&m| m != c.market)
                    .map(move |&m| edge(graph, m, c.buyer))
            })
            .collect();

        Self {
            round: round.index,
            status: round.status,
            prices: market_prices(graph, &round.prices),
            chosen_edges,
            tie_edges,
            buyer_labels: buyer_labels(graph, &round.net),
        }
    }

    /// Closing frame: the final assignment highlighted, ties dropped.
    pub fn final_frame(graph: &ValuationGraph, outcome: &AuctionOutcome) -> Self {
        Self {
            status: outcome.status,
            tie_edges: Vec::new(),
            ..Self::from_round(graph, &outcome.last_round)
        }
    }
}

// ============================================================================
// Detailed Valuations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketUtility {
    pub market: String,
    pub utility: Utility,
}

/// One buyer's net utility against every market, 0 where it has no edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DetailedValuation {
    pub buyer: String,
    pub best_market: String,
    pub best_utility: Utility,
    /// Sorted by market label.
    pub row: Vec<MarketUtility>,
}

/// The full buyer-by-market table. Unlike demand resolution, missing edges
/// count as 0 here, so `best_market` can be a market the buyer has no edge to.
/// Rows are ordered by market label, and among equal entries the first in
/// that order is reported.
pub fn detailed_valuations(graph: &ValuationGraph, net: &NetUtilities) -> Vec<DetailedValuation> {
    graph
        .buyers()
        .iter()
        .map(|buyer| {
            let mut row: Vec<MarketUtility> = graph
                .markets()
                .iter()
                .map(|m| MarketUtility {
                    market: m.label.clone(),
                    utility: net.get(m.id, buyer.id).unwrap_or(0.0),
                })
                .collect();
            row.sort_by(|a, b| a.market.cmp(&b.market));
            let best = row.iter().fold(&row[0], |best, entry| {
                if entry.utility > best.utility { entry } else { best }
            });
            let (best_market, best_utility) = (best.market.clone(), best.utility);
            DetailedValuation {
                buyer: buyer.label.clone(),
                best_market,
                best_utility,
                row,
            }
        })
        .collect()
}

// ============================================================================
// Final Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MatchReport {
    pub status: AuctionStatus,
    pub rounds: u32,
    /// (market, buyer) for every buyer, in buyer order.
    pub pairs: Vec<EdgeRef>,
    pub prices: Vec<MarketPrice>,
}

impl MatchReport {
    pub fn new(graph: &ValuationGraph, outcome: &AuctionOutcome) -> Self {
        Self {
            status: outcome.status,
            rounds: outcome.rounds,
            pairs: outcome
                .assignment()
                .choices()
                .iter()
                .map(|c| edge(graph, c.market, c.buyer))
                .collect(),
            prices: market_prices(graph, outcome.prices()),
        }
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            AuctionStatus::Converged => writeln!(f, "Perfect match found at round {}:", self.rounds)?,
            _ => writeln!(
                f,
                "No perfect match after {} rounds; last assignment:",
                self.rounds
            )?,
        }
        for pair in &self.pairs {
            writeln!(f, "Node {} is matched with Node {}", pair.market, pair.buyer)?;
        }
        writeln!(f, "Prices:")?;
        for p in &self.prices {
            writeln!(f, "Node {} = {}", p.market, p.price)?;
        }
        Ok(())
    }
}
