//! Error types for graph validation and the auction loop.

use crate::types::Price;

/// Why an input graph cannot be auctioned. Every variant names the offending
/// node or edge by its input id.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedGraph {
    #[error("graph input could not be decoded: {0}")]
    Decode(String),

    #[error("graph has no nodes")]
    Empty,

    #[error("graph has no market nodes (bipartite = 0)")]
    NoMarkets,

    #[error("graph has no buyer nodes (bipartite = 1)")]
    NoBuyers,

    #[error("node {node} has no `bipartite` attribute")]
    MissingBipartite { node: String },

    #[error("node {node} has bipartite = {value}, expected 0 or 1")]
    InvalidBipartite { node: String, value: i64 },

    #[error("node {node} is listed more than once")]
    DuplicateNode { node: String },

    #[error("edge {from} -> {to} references unknown node {node}")]
    UnknownNode {
        from: String,
        to: String,
        node: String,
    },

    #[error("edge {from} -> {to} joins two nodes on the same side")]
    SameSide { from: String, to: String },

    #[error("edge between market {market} and buyer {buyer} is listed more than once")]
    DuplicateEdge { market: String, buyer: String },

    #[error("edge between market {market} and buyer {buyer} has no `valuation`")]
    MissingValuation { market: String, buyer: String },

    #[error("edge between market {market} and buyer {buyer} has non-finite valuation {value}")]
    NonFiniteValuation {
        market: String,
        buyer: String,
        value: f64,
    },

    #[error("no assignment covers every buyer; unplaceable: {buyers:?}")]
    NoPerfectMatching { buyers: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuctionError {
    #[error("malformed valuation graph: {0}")]
    MalformedGraph(#[from] MalformedGraph),

    #[error("buyer {buyer} has no valuation edges")]
    IsolatedBuyer { buyer: String },

    #[error("market {market} has no entry in the price vector")]
    MissingPrice { market: String },

    #[error("price of market {market} cannot rise any further")]
    PriceOverflow { market: String },

    #[error("no market-clearing matching within {rounds} rounds")]
    NonTermination { rounds: u32, prices: Vec<Price> },
}

pub type Result<T, E = AuctionError> = std::result::Result<T, E>;
