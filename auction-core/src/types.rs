use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

// ============================================================================
// Scalars
// ============================================================================

/// Market price. Starts at the node's `price` attribute and only ever rises.
pub type Price = u64;
/// A buyer's gross worth for one market, as given on the edge.
pub type Valuation = f64;
/// Valuation minus current price.
pub type Utility = f64;

// ============================================================================
// IDs - Dense indices assigned in input order
// ============================================================================

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct MarketId(pub u32);

impl MarketId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct BuyerId(pub u32);

impl BuyerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Auction Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    /// Some market is still over-demanded.
    Searching,
    /// Every buyer holds a distinct market.
    Converged,
    /// The round bound was reached first.
    Stalled,
}

impl AuctionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuctionStatus::Searching)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuctionStatus::Searching => "searching",
            AuctionStatus::Converged => "converged",
            AuctionStatus::Stalled => "stalled",
        }
    }
}
