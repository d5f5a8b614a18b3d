//! Round driver: adjust valuations, resolve demand, detect the constricted
//! set, check convergence, raise prices, repeat.

use std::collections::BTreeSet;

use crate::config::{AuctionConfig, StallPolicy};
use crate::constricted::constricted_set;
use crate::convergence::check;
use crate::demand::{Assignment, Demand, assign, resolve_demand};
use crate::error::{AuctionError, Result};
use crate::graph::ValuationGraph;
use crate::state::AuctionState;
use crate::types::{AuctionStatus, MarketId, Price};
use crate::valuation::{NetUtilities, adjust_valuations};

/// Everything computed in one round, at the prices the round started with.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub index: u32,
    pub prices: Vec<Price>,
    pub net: NetUtilities,
    pub demand: Demand,
    pub assignment: Assignment,
    /// Markets chosen by two or more buyers; raised by one after the round.
    pub constricted: BTreeSet<MarketId>,
    /// `Searching` or `Converged`.
    pub status: AuctionStatus,
}

/// Evaluate one round without touching prices.
pub fn evaluate_round(graph: &ValuationGraph, state: &AuctionState) -> Result<Round> {
    let net = adjust_valuations(graph, &state.prices)?;
    let demand = resolve_demand(graph, &net)?;
    let assignment = assign(&demand, graph.market_count());
    let constricted = constricted_set(&assignment);
    let status = check(&assignment);
    debug_assert_eq!(constricted.is_empty(), status == AuctionStatus::Converged);

    Ok(Round {
        index: state.round,
        prices: state.prices.clone(),
        net,
        demand,
        assignment,
        constricted,
        status,
    })
}

/// Evaluate the round for `state` and return it with the state for the next
/// round, or `None` once the round converged.
pub fn step(graph: &ValuationGraph, state: AuctionState) -> Result<(Round, Option<AuctionState>)> {
    let round = evaluate_round(graph, &state)?;

    #[cfg(feature = "instrument")]
    log_round(&round);

    let next = match round.status {
        AuctionStatus::Converged => None,
        _ => Some(state.raise(&round.constricted).map_err(|market| {
            AuctionError::PriceOverflow {
                market: graph.market(market).label.clone(),
            }
        })?),
    };
    Ok((round, next))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuctionOutcome {
    /// `Converged`, or `Stalled` under `StallPolicy::Report`.
    pub status: AuctionStatus,
    /// Index of the last evaluated round.
    pub rounds: u32,
    pub last_round: Round,
}

impl AuctionOutcome {
    /// Prices the final assignment was computed at.
    pub fn prices(&self) -> &[Price] {
        &self.last_round.prices
    }

    pub fn assignment(&self) -> &Assignment {
        &self.last_round.assignment
    }

    pub fn is_converged(&self) -> bool {
        self.status == AuctionStatus::Converged
    }
}

pub fn run_auction(graph: &ValuationGraph, config: &AuctionConfig) -> Result<AuctionOutcome> {
    run_auction_with(graph, config, |_| {})
}

/// Run from the graph's starting prices, handing every evaluated round to
/// `observe` before deciding what happens next.
pub fn run_auction_with(
    graph: &ValuationGraph,
    config: &AuctionConfig,
    observe: impl FnMut(&Round),
) -> Result<AuctionOutcome> {
    run_from(graph, config, AuctionState::initial(graph), observe)
}

/// Run from an arbitrary state. The round bound counts rounds evaluated by
/// this call.
pub fn run_from(
    graph: &ValuationGraph,
    config: &AuctionConfig,
    mut state: AuctionState,
    mut observe: impl FnMut(&Round),
) -> Result<AuctionOutcome> {
    let limit = config.round_limit();
    let mut evaluated = 0;

    loop {
        let (round, next) = step(graph, state)?;
        evaluated += 1;
        observe(&round);

        match next {
            None => return Ok(finish(graph, round, AuctionStatus::Converged)),
            Some(_) if evaluated >= limit => return stall(graph, config, round, evaluated),
            Some(next) => state = next,
        }
    }
}

/// Apply the stall policy to the last round evaluated.
pub(crate) fn stall(
    graph: &ValuationGraph,
    config: &AuctionConfig,
    round: Round,
    evaluated: u32,
) -> Result<AuctionOutcome> {
    match config.on_stall {
        StallPolicy::Fail => {
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "outcome",
                status = AuctionStatus::Stalled.as_str(),
                rounds = round.index,
                matched = round.assignment.seated_count(),
            );
            Err(AuctionError::NonTermination {
                rounds: evaluated,
                prices: round.prices,
            })
        }
        StallPolicy::Report => Ok(finish(graph, round, AuctionStatus::Stalled)),
    }
}

pub(crate) fn finish(graph: &ValuationGraph, round: Round, status: AuctionStatus) -> AuctionOutcome {
    #[cfg(feature = "instrument")]
    {
        for choice in round.assignment.choices() {
            tracing::info!(
                target: "outcome",
                status = status.as_str(),
                rounds = round.index,
                market = graph.market(choice.market).label.as_str(),
                buyer = graph.buyer(choice.buyer).label.as_str(),
            );
        }
    }
    let _ = graph; // only read by instrumentation

    AuctionOutcome {
        status,
        rounds: round.index,
        last_round: round,
    }
}

#[cfg(feature = "instrument")]
fn log_round(round: &Round) {
    tracing::info!(
        target: "round",
        round = round.index,
        status = round.status.as_str(),
        constricted = round.constricted.len(),
        seated = round.assignment.seated_count(),
    );
    for (market, price) in round.prices.iter().enumerate() {
        tracing::info!(
            target: "price",
            round = round.index,
            market_id = market as u32,
            price = *price,
            raised = round.constricted.contains(&MarketId::new(market as u32)),
        );
    }
    for choice in round.assignment.choices() {
        tracing::info!(
            target: "choice",
            round = round.index,
            buyer_id = choice.buyer.0,
            market_id = choice.market.0,
            net_utility = choice.utility,
            tied = round.demand.of(choice.buyer).is_tied(),
            seated = choice.seated,
        );
    }
}
