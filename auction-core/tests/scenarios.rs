//! End-to-end auction scenarios.
//!
//! Each test builds a small valuation graph, runs the auction, and checks the
//! clearing prices, the matching, and the round in which it appeared.

use std::collections::BTreeSet;

use auction_core::{
    AuctionConfig, AuctionError, AuctionStatus, BuyerId, GraphInput, MalformedGraph, MarketId,
    MatchReport, StallPolicy, ValuationGraph, run_auction, run_auction_with,
};

// === FIXTURES ===

/// Two buyers who both rank M1 two points above M2.
fn two_buyers_one_favourite() -> ValuationGraph {
    ValuationGraph::from_input(
        &GraphInput::new()
            .with_market("M1", 0)
            .with_market("M2", 0)
            .with_buyer("B1")
            .with_buyer("B2")
            .with_edge("M1", "B1", 10.0)
            .with_edge("M2", "B1", 8.0)
            .with_edge("M1", "B2", 9.0)
            .with_edge("M2", "B2", 7.0),
    )
    .unwrap()
}

/// Buyers whose preference flips at price gaps of 0.5 and 0.25. With whole
/// unit price steps they always end up wanting the same market.
fn never_splits() -> ValuationGraph {
    ValuationGraph::from_input(
        &GraphInput::new()
            .with_market("M1", 0)
            .with_market("M2", 0)
            .with_buyer("B1")
            .with_buyer("B2")
            .with_edge("M1", "B1", 0.5)
            .with_edge("M2", "B1", 0.0)
            .with_edge("M1", "B2", 0.25)
            .with_edge("M2", "B2", 0.0),
    )
    .unwrap()
}

// === SCENARIOS ===

#[test]
fn contested_favourite_clears_after_two_raises() {
    let graph = two_buyers_one_favourite();
    let mut constricted = Vec::new();
    let outcome = run_auction_with(&graph, &AuctionConfig::default(), |round| {
        constricted.push(round.constricted.clone());
    })
    .unwrap();

    assert_eq!(outcome.status, AuctionStatus::Converged);
    assert_eq!(outcome.rounds, 3);
    assert_eq!(outcome.prices(), &[2, 0]);
    assert_eq!(
        constricted,
        vec![
            BTreeSet::from([MarketId(0)]),
            BTreeSet::from([MarketId(0)]),
            BTreeSet::new(),
        ]
    );

    let assignment = outcome.assignment();
    assert_eq!(assignment.choice(BuyerId(0)).market, MarketId(0));
    assert_eq!(assignment.choice(BuyerId(1)).market, MarketId(1));
    assert_eq!(assignment.choice(BuyerId(0)).utility, 8.0);
    assert_eq!(assignment.choice(BuyerId(1)).utility, 7.0);
}

#[test]
fn isolated_buyer_stops_the_auction_before_round_one() {
    let input = GraphInput::new()
        .with_market("M1", 0)
        .with_market("M2", 0)
        .with_buyer("B1")
        .with_buyer("lonely")
        .with_edge("M1", "B1", 3.0);

    assert_eq!(
        ValuationGraph::from_input(&input),
        Err(AuctionError::IsolatedBuyer {
            buyer: "lonely".into()
        })
    );
}

#[test]
fn round_bound_stops_an_instance_that_never_clears() {
    let graph = never_splits();
    let bound = AuctionConfig::default().with_max_rounds(1000);

    assert_eq!(
        run_auction(&graph, &bound),
        Err(AuctionError::NonTermination {
            rounds: 1000,
            prices: vec![500, 499],
        })
    );

    let mut changes = [0u32; 2];
    let mut last: Option<Vec<u64>> = None;
    let outcome = run_auction_with(
        &graph,
        &bound.with_stall_policy(StallPolicy::Report),
        |round| {
            if let Some(prev) = &last {
                for (m, (a, b)) in prev.iter().zip(&round.prices).enumerate() {
                    if a != b {
                        changes[m] += 1;
                    }
                }
            }
            last = Some(round.prices.clone());
        },
    )
    .unwrap();

    assert_eq!(outcome.status, AuctionStatus::Stalled);
    assert_eq!(outcome.rounds, 1000);
    assert!(changes.iter().all(|&c| c <= 1000), "changes: {changes:?}");
    assert_eq!(changes, [500, 499]);

    // Best-known assignment: both buyers on M2 at a gap of one.
    let markets: Vec<MarketId> = outcome
        .assignment()
        .choices()
        .iter()
        .map(|c| c.market)
        .collect();
    assert_eq!(markets, vec![MarketId(1), MarketId(1)]);
}

#[test]
fn distinct_favourites_clear_in_round_one() {
    let graph = ValuationGraph::from_input(
        &GraphInput::new()
            .with_market("M1", 2)
            .with_market("M2", 0)
            .with_market("M3", 1)
            .with_buyer("B1")
            .with_buyer("B2")
            .with_buyer("B3")
            .with_edge("M1", "B1", 9.0)
            .with_edge("M2", "B1", 3.0)
            .with_edge("M2", "B2", 6.0)
            .with_edge("M3", "B2", 2.0)
            .with_edge("M3", "B3", 4.0)
            .with_edge("M1", "B3", 1.0),
    )
    .unwrap();

    let outcome = run_auction(&graph, &AuctionConfig::default()).unwrap();

    assert_eq!(outcome.status, AuctionStatus::Converged);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.prices(), &[2, 0, 1]);
    let report = MatchReport::new(&graph, &outcome);
    let pairs: Vec<(&str, &str)> = report
        .pairs
        .iter()
        .map(|p| (p.market.as_str(), p.buyer.as_str()))
        .collect();
    assert_eq!(pairs, vec![("M1", "B1"), ("M2", "B2"), ("M3", "B3")]);
}

#[test]
fn starting_prices_can_already_clear_a_contest() {
    // Same buyers as the contested scenario, but M1 already costs 2.
    let graph = ValuationGraph::from_input(
        &GraphInput::new()
            .with_market("M1", 2)
            .with_market("M2", 0)
            .with_buyer("B1")
            .with_buyer("B2")
            .with_edge("M1", "B1", 10.0)
            .with_edge("M2", "B1", 8.0)
            .with_edge("M1", "B2", 9.0)
            .with_edge("M2", "B2", 7.0),
    )
    .unwrap();

    let outcome = run_auction(&graph, &AuctionConfig::default()).unwrap();
    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.prices(), &[2, 0]);
}

#[test]
fn spare_markets_stay_at_their_price() {
    let graph = ValuationGraph::from_input(
        &GraphInput::new()
            .with_market("M1", 0)
            .with_market("M2", 0)
            .with_market("spare", 7)
            .with_buyer("B1")
            .with_buyer("B2")
            .with_edge("M1", "B1", 4.0)
            .with_edge("M2", "B1", 1.0)
            .with_edge("M1", "B2", 4.0)
            .with_edge("M2", "B2", 2.0),
    )
    .unwrap();

    let outcome = run_auction(&graph, &AuctionConfig::default()).unwrap();
    assert!(outcome.is_converged());
    assert_eq!(outcome.prices()[2], 7);
    let taken: BTreeSet<MarketId> = outcome
        .assignment()
        .choices()
        .iter()
        .map(|c| c.market)
        .collect();
    assert_eq!(taken, BTreeSet::from([MarketId(0), MarketId(1)]));
}

#[test]
fn node_link_document_runs_end_to_end() {
    let json = r#"{
        "directed": false,
        "multigraph": false,
        "graph": {},
        "nodes": [
            {"id": "a", "bipartite": 0},
            {"id": "b", "bipartite": 0},
            {"id": "c", "bipartite": 0},
            {"id": "x", "bipartite": 1},
            {"id": "y", "bipartite": 1},
            {"id": "z", "bipartite": 1}
        ],
        "links": [
            {"source": "a", "target": "x", "valuation": 12},
            {"source": "b", "target": "x", "valuation": 4},
            {"source": "c", "target": "x", "valuation": 2},
            {"source": "a", "target": "y", "valuation": 8},
            {"source": "b", "target": "y", "valuation": 7},
            {"source": "c", "target": "y", "valuation": 6},
            {"source": "a", "target": "z", "valuation": 7},
            {"source": "b", "target": "z", "valuation": 5},
            {"source": "c", "target": "z", "valuation": 2}
        ]
    }"#;

    let graph = ValuationGraph::from_json(json).unwrap();
    let outcome = run_auction(&graph, &AuctionConfig::default()).unwrap();
    assert!(outcome.is_converged());

    // Clearing prices leave every buyer on a best response.
    for choice in outcome.assignment().choices() {
        let best = outcome.last_round.demand.of(choice.buyer);
        assert!(best.ties.contains(&choice.market));
    }

    let text = MatchReport::new(&graph, &outcome).to_string();
    assert!(text.starts_with("Perfect match found at round"));
    assert_eq!(text.matches("is matched with").count(), 3);
}

#[test]
fn malformed_inputs_fail_with_the_offending_node() {
    let same_side = GraphInput::new()
        .with_market("M1", 0)
        .with_buyer("B1")
        .with_buyer("B2")
        .with_edge("M1", "B1", 1.0)
        .with_edge("B2", "B1", 1.0);
    assert_eq!(
        ValuationGraph::from_input(&same_side),
        Err(AuctionError::MalformedGraph(MalformedGraph::SameSide {
            from: "B2".into(),
            to: "B1".into(),
        }))
    );

    let too_many_buyers = GraphInput::new()
        .with_market("M1", 0)
        .with_buyer("B1")
        .with_buyer("B2")
        .with_edge("M1", "B1", 1.0)
        .with_edge("M1", "B2", 2.0);
    assert_eq!(
        ValuationGraph::from_input(&too_many_buyers),
        Err(AuctionError::MalformedGraph(
            MalformedGraph::NoPerfectMatching {
                buyers: vec!["B2".into()]
            }
        ))
    );
}
