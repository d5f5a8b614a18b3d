use crate::error::{AuctionError, Result};
use crate::graph::ValuationGraph;
use crate::types::{BuyerId, MarketId, Price, Utility};

/// Net utility of every edge under one price vector.
#[derive(Debug, Clone, PartialEq)]
pub struct NetUtilities {
    /// Indexed by buyer, entries in the buyer's edge order.
    by_buyer: Vec<Vec<(MarketId, Utility)>>,
}

impl NetUtilities {
    pub fn of(&self, buyer: BuyerId) -> &[(MarketId, Utility)] {
        &self.by_buyer[buyer.index()]
    }

    pub fn get(&self, market: MarketId, buyer: BuyerId) -> Option<Utility> {
        self.by_buyer
            .get(buyer.index())?
            .iter()
            .find(|(m, _)| *m == market)
            .map(|&(_, u)| u)
    }

    pub fn buyers(&self) -> impl Iterator<Item = (BuyerId, &[(MarketId, Utility)])> {
        self.by_buyer
            .iter()
            .enumerate()
            .map(|(b, row)| (BuyerId::new(b as u32), row.as_slice()))
    }
}

/// `valuation - price` for every edge. Fails if an edge's market has no price.
pub fn adjust_valuations(graph: &ValuationGraph, prices: &[Price]) -> Result<NetUtilities> {
    let by_buyer = graph
        .buyers()
        .iter()
        .map(|buyer| {
            buyer
                .edges
                .iter()
                .map(|edge| -> Result<(MarketId, Utility)> {
                    let price = prices.get(edge.market.index()).copied().ok_or_else(|| {
                        AuctionError::MissingPrice {
                            market: graph.market(edge.market).label.clone(),
                        }
                    })?;
                    Ok((edge.market, edge.valuation - price as Utility))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(NetUtilities { by_buyer })
}
