//! Maximum bipartite matching over buyer adjacency lists.
//!
//! Used twice: once on the full valuation graph to check that the auction can
//! clear at all, and every round on the demand graph (each buyer's tie set)
//! to seat buyers.

use crate::types::{BuyerId, MarketId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    market_of: Vec<Option<MarketId>>,
    buyer_of: Vec<Option<BuyerId>>,
}

impl Matching {
    /// Maximum matching where `adjacency[b]` lists the markets buyer `b` may
    /// take, in preference order.
    ///
    /// Deterministic: buyers are seated in index order, each on the first free
    /// market of its list; buyers left over then look for augmenting paths,
    /// again scanning lists front to back.
    pub fn maximum<A: AsRef<[MarketId]>>(market_count: usize, adjacency: &[A]) -> Self {
        let mut matching = Self {
            market_of: vec![None; adjacency.len()],
            buyer_of: vec![None; market_count],
        };

        for (b, markets) in adjacency.iter().enumerate() {
            let free = markets
                .as_ref()
                .iter()
                .find(|m| matching.buyer_of[m.index()].is_none());
            if let Some(&market) = free {
                matching.pair(BuyerId::new(b as u32), market);
            }
        }

        for b in 0..adjacency.len() {
            if matching.market_of[b].is_none() {
                let mut visited = vec![false; market_count];
                matching.augment(BuyerId::new(b as u32), adjacency, &mut visited);
            }
        }

        matching
    }

    fn augment<A: AsRef<[MarketId]>>(
        &mut self,
        buyer: BuyerId,
        adjacency: &[A],
        visited: &mut [bool],
    ) -> bool {
        for &market in adjacency[buyer.index()].as_ref() {
            if std::mem::replace(&mut visited[market.index()], true) {
                continue;
            }
            let reseated = match self.buyer_of[market.index()] {
                None => true,
                Some(holder) => self.augment(holder, adjacency, visited),
            };
            if reseated {
                self.pair(buyer, market);
                return true;
            }
        }
        false
    }

    fn pair(&mut self, buyer: BuyerId, market: MarketId) {
        self.market_of[buyer.index()] = Some(market);
        self.buyer_of[market.index()] = Some(buyer);
    }

    pub fn market_of(&self, buyer: BuyerId) -> Option<MarketId> {
        self.market_of.get(buyer.index()).copied().flatten()
    }

    pub fn buyer_of(&self, market: MarketId) -> Option<BuyerId> {
        self.buyer_of.get(market.index()).copied().flatten()
    }

    pub fn size(&self) -> usize {
        self.market_of.iter().filter(|m| m.is_some()).count()
    }

    pub fn is_perfect(&self) -> bool {
        self.market_of.iter().all(Option::is_some)
    }

    pub fn unmatched_buyers(&self) -> impl Iterator<Item = BuyerId> + '_ {
        self.market_of
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_none())
            .map(|(b, _)| BuyerId::new(b as u32))
    }
}
