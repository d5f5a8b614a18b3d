use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::graph::ValuationGraph;
use crate::types::{MarketId, Price};

/// Everything that carries over between rounds. Owned by the driver and
/// replaced wholesale once per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionState {
    /// Indexed by `MarketId`.
    pub prices: Vec<Price>,
    /// Index of the next round to evaluate, starting at 1.
    pub round: u32,
}

impl AuctionState {
    /// Round 1 at the graph's starting prices.
    pub fn initial(graph: &ValuationGraph) -> Self {
        Self {
            prices: graph.markets().iter().map(|m| m.initial_price).collect(),
            round: 1,
        }
    }

    pub fn with_prices(prices: Vec<Price>) -> Self {
        Self { prices, round: 1 }
    }

    pub fn price(&self, market: MarketId) -> Option<Price> {
        self.prices.get(market.index()).copied()
    }

    /// Raise each listed market by exactly one and move to the next round.
    /// Fails with the first market already at `Price::MAX`, leaving no price
    /// changed.
    pub fn raise(mut self, markets: &BTreeSet<MarketId>) -> Result<Self, MarketId> {
        if let Some(&stuck) = markets
            .iter()
            .find(|m| self.price(**m) == Some(Price::MAX))
        {
            return Err(stuck);
        }
        for market in markets {
            debug_assert!(market.index() < self.prices.len(), "raise of unpriced market");
            if let Some(price) = self.prices.get_mut(market.index()) {
                *price += 1;
            }
        }
        self.round += 1;
        Ok(self)
    }
}
