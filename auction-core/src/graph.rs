//! Bipartite valuation graph: input boundary and validated form.
//!
//! The input mirrors node-link JSON as written by common graph libraries:
//! nodes carry `bipartite` (0 = market, 1 = buyer) and an optional `price`,
//! links carry `valuation`. Link endpoints may be given in either order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use tsify_next::Tsify;

use crate::error::{AuctionError, MalformedGraph, Result};
use crate::matching::Matching;
use crate::types::{BuyerId, MarketId, Price, Valuation};

// ============================================================================
// Input Boundary
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct GraphInput {
    pub nodes: Vec<NodeInput>,
    #[serde(default, alias = "edges")]
    pub links: Vec<EdgeInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct NodeInput {
    #[serde(deserialize_with = "node_label")]
    #[tsify(type = "string | number")]
    pub id: String,
    #[serde(default)]
    pub bipartite: Option<i64>,
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct EdgeInput {
    #[serde(deserialize_with = "node_label")]
    #[tsify(type = "string | number")]
    pub source: String,
    #[serde(deserialize_with = "node_label")]
    #[tsify(type = "string | number")]
    pub target: String,
    #[serde(default)]
    pub valuation: Option<Valuation>,
}

/// Node ids are strings or integers in node-link files; both become labels.
fn node_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Int(i64),
    }
    Ok(match Label::deserialize(deserializer)? {
        Label::Text(s) => s,
        Label::Int(n) => n.to_string(),
    })
}

impl GraphInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, id: impl Into<String>, price: Price) -> Self {
        self.nodes.push(NodeInput {
            id: id.into(),
            bipartite: Some(0),
            price: Some(price),
        });
        self
    }

    pub fn with_buyer(mut self, id: impl Into<String>) -> Self {
        self.nodes.push(NodeInput {
            id: id.into(),
            bipartite: Some(1),
            price: None,
        });
        self
    }

    pub fn with_edge(
        mut self,
        market: impl Into<String>,
        buyer: impl Into<String>,
        valuation: Valuation,
    ) -> Self {
        self.links.push(EdgeInput {
            source: market.into(),
            target: buyer.into(),
            valuation: Some(valuation),
        });
        self
    }
}

// ============================================================================
// Validated Graph
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub id: MarketId,
    pub label: String,
    pub initial_price: Price,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Buyer {
    pub id: BuyerId,
    pub label: String,
    /// Incident edges in input order.
    pub edges: Vec<ValuationEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationEdge {
    pub market: MarketId,
    pub buyer: BuyerId,
    pub valuation: Valuation,
}

/// A graph that passed every structural check. Markets and buyers are
/// numbered in the order they appear in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationGraph {
    markets: Vec<Market>,
    buyers: Vec<Buyer>,
}

enum Side {
    Market(MarketId),
    Buyer(BuyerId),
}

impl ValuationGraph {
    pub fn from_json(json: &str) -> Result<Self> {
        let input: GraphInput = serde_json::from_str(json)
            .map_err(|e| AuctionError::from(MalformedGraph::Decode(e.to_string())))?;
        Self::from_input(&input)
    }

    /// Validate `input`. Fails on the first structural problem, then on the
    /// first buyer without edges, then if no assignment can place every buyer.
    pub fn from_input(input: &GraphInput) -> Result<Self> {
        if input.nodes.is_empty() {
            return Err(MalformedGraph::Empty.into());
        }

        let mut markets = Vec::new();
        let mut buyers = Vec::new();
        let mut sides: HashMap<&str, Side> = HashMap::new();

        for node in &input.nodes {
            if sides.contains_key(node.id.as_str()) {
                return Err(MalformedGraph::DuplicateNode {
                    node: node.id.clone(),
                }
                .into());
            }
            let side = match node.bipartite {
                None => {
                    return Err(MalformedGraph::MissingBipartite {
                        node: node.id.clone(),
                    }
                    .into());
                }
                Some(0) => {
                    let id = MarketId::new(markets.len() as u32);
                    markets.push(Market {
                        id,
                        label: node.id.clone(),
                        initial_price: node.price.unwrap_or(0),
                    });
                    Side::Market(id)
                }
                Some(1) => {
                    let id = BuyerId::new(buyers.len() as u32);
                    buyers.push(Buyer {
                        id,
                        label: node.id.clone(),
                        edges: Vec::new(),
                    });
                    Side::Buyer(id)
                }
                Some(value) => {
                    return Err(MalformedGraph::InvalidBipartite {
                        node: node.id.clone(),
                        value,
                    }
                    .into());
                }
            };
            sides.insert(node.id.as_str(), side);
        }

        if markets.is_empty() {
            return Err(MalformedGraph::NoMarkets.into());
        }
        if buyers.is_empty() {
            return Err(MalformedGraph::NoBuyers.into());
        }

        let mut seen: HashSet<(MarketId, BuyerId)> = HashSet::new();
        for edge in &input.links {
            let lookup = |node: &str| {
                sides.get(node).ok_or_else(|| MalformedGraph::UnknownNode {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    node: node.to_string(),
                })
            };
            let (market, buyer) = match (lookup(&edge.source)?, lookup(&edge.target)?) {
                (Side::Market(m), Side::Buyer(b)) | (Side::Buyer(b), Side::Market(m)) => (*m, *b),
                _ => {
                    return Err(MalformedGraph::SameSide {
                        from: edge.source.clone(),
                        to: edge.target.clone(),
                    }
                    .into());
                }
            };

            let names = || {
                (
                    markets[market.index()].label.clone(),
                    buyers[buyer.index()].label.clone(),
                )
            };
            let valuation = match edge.valuation {
                None => {
                    let (market, buyer) = names();
                    return Err(MalformedGraph::MissingValuation { market, buyer }.into());
                }
                Some(v) if !v.is_finite() => {
                    let (market, buyer) = names();
                    return Err(MalformedGraph::NonFiniteValuation {
                        market,
                        buyer,
                        value: v,
                    }
                    .into());
                }
                Some(v) => v,
            };
            if !seen.insert((market, buyer)) {
                let (market, buyer) = names();
                return Err(MalformedGraph::DuplicateEdge { market, buyer }.into());
            }

            buyers[buyer.index()].edges.push(ValuationEdge {
                market,
                buyer,
                valuation,
            });
        }

        if let Some(buyer) = buyers.iter().find(|b| b.edges.is_empty()) {
            return Err(AuctionError::IsolatedBuyer {
                buyer: buyer.label.clone(),
            });
        }

        let graph = Self { markets, buyers };
        graph.check_placeable()?;
        Ok(graph)
    }

    /// Every buyer must be placeable on a distinct market through its edges,
    /// otherwise prices would rise forever.
    fn check_placeable(&self) -> Result<()> {
        let adjacency: Vec<Vec<MarketId>> = self
            .buyers
            .iter()
            .map(|b| {
                let mut markets: Vec<MarketId> = b.edges.iter().map(|e| e.market).collect();
                markets.sort();
                markets
            })
            .collect();
        let matching = Matching::maximum(self.markets.len(), &adjacency);
        if matching.is_perfect() {
            return Ok(());
        }
        Err(MalformedGraph::NoPerfectMatching {
            buyers: matching
                .unmatched_buyers()
                .map(|b| self.buyers[b.index()].label.clone())
                .collect(),
        }
        .into())
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn buyers(&self) -> &[Buyer] {
        &self.buyers
    }

    pub fn market(&self, id: MarketId) -> &Market {
        &self.markets[id.index()]
    }

    pub fn buyer(&self, id: BuyerId) -> &Buyer {
        &self.buyers[id.index()]
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    pub fn buyer_count(&self) -> usize {
        self.buyers.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ValuationEdge> {
        self.buyers.iter().flat_map(|b| b.edges.iter())
    }

    pub fn valuation(&self, market: MarketId, buyer: BuyerId) -> Option<Valuation> {
        self.buyers
            .get(buyer.index())?
            .edges
            .iter()
            .find(|e| e.market == market)
            .map(|e| e.valuation)
    }

    pub fn market_by_label(&self, label: &str) -> Option<MarketId> {
        self.markets.iter().find(|m| m.label == label).map(|m| m.id)
    }

    pub fn buyer_by_label(&self, label: &str) -> Option<BuyerId> {
        self.buyers.iter().find(|b| b.label == label).map(|b| b.id)
    }
}
